//! Room configuration and lifecycle state machine.

use orchard_world::WorldConfig;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Configuration for a room instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Maximum concurrent connections. Enforced by the room actor, not by
    /// the controller.
    pub max_clients: usize,

    /// Capacity of the actor's command channel.
    pub channel_size: usize,

    /// Settings of the world the room owns.
    pub world: WorldConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            max_clients: 4,
            channel_size: 64,
            world: WorldConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomLifecycle
// ---------------------------------------------------------------------------

/// The lifecycle of a room.
///
/// ```text
/// Created → Active → Disposed
/// ```
///
/// - **Created**: the controller exists but its world has no pickups yet.
/// - **Active**: the initial population is spawned; events are accepted.
/// - **Disposed**: timers cancelled, world released. Terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomLifecycle {
    Created,
    Active,
    Disposed,
}

impl RoomLifecycle {
    /// Returns `true` if the room accepts join/leave/message events.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// The only state reachable from this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::Active),
            Self::Active => Some(Self::Disposed),
            Self::Disposed => None,
        }
    }

    /// Returns `true` if transitioning to `target` is valid.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for RoomLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Active => write!(f, "Active"),
            Self::Disposed => write!(f, "Disposed"),
        }
    }
}
