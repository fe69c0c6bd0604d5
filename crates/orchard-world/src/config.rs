//! World configuration and the skin allocation policies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What happens to a player's skin when they leave the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinRelease {
    /// The skin goes back to the pool and can be handed to the next joiner.
    #[default]
    Return,
    /// The skin stays out of the pool for the lifetime of the room, which
    /// turns the pool into a soft cap on distinct appearances.
    Retain,
}

/// What a joining player gets when the pool is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinFallback {
    /// Assign the reserved [`SkinIndex::OVERFLOW`](orchard_protocol::SkinIndex::OVERFLOW).
    #[default]
    Overflow,
    /// Reuse a random pooled index, sharing it with another player.
    Shared,
}

/// Configuration for a room's world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Width of the square playfield. Spawn coordinates are whole numbers
    /// in `[-range/2, range/2)`.
    pub playfield_range: u32,

    /// Pickups spawned when the room becomes active.
    pub initial_pickups: usize,

    /// How long an eliminated id stays in the cooldown record.
    pub elimination_cooldown: Duration,

    pub skin_release: SkinRelease,

    pub skin_fallback: SkinFallback,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            playfield_range: 128,
            initial_pickups: 100,
            elimination_cooldown: Duration::from_secs(10),
            skin_release: SkinRelease::default(),
            skin_fallback: SkinFallback::default(),
        }
    }
}

impl WorldConfig {
    /// Smallest playfield that still has room to relocate a pickup.
    pub const MIN_PLAYFIELD_RANGE: u32 = 2;

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called by [`WorldState::new`](crate::WorldState::new).
    pub fn validated(mut self) -> Self {
        if self.playfield_range < Self::MIN_PLAYFIELD_RANGE {
            tracing::warn!(
                range = self.playfield_range,
                min = Self::MIN_PLAYFIELD_RANGE,
                "playfield_range below minimum, clamping"
            );
            self.playfield_range = Self::MIN_PLAYFIELD_RANGE;
        }
        self
    }

    /// Half the playfield width. Spawn coordinates lie in `[-half, half)`.
    pub fn half_range(&self) -> i64 {
        i64::from(self.playfield_range / 2)
    }
}
