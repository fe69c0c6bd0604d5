//! Identity types and the frames that travel on the wire.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque per-connection identifier assigned by the hosting substrate.
///
/// The room never interprets it: it's only compared and used as a map key.
/// `#[serde(transparent)]` keeps it a plain JSON string on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps a raw identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a pickup. Issued in strictly increasing order and never
/// reused for the lifetime of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PickupId(pub u64);

impl PickupId {
    /// The id following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for PickupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "apple-{}", self.0)
    }
}

/// A player's visual appearance.
///
/// Indices `0..POOL_SIZE` come from the room's skin pool. [`Self::OVERFLOW`]
/// sits just past the pool and is handed out when the pool is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkinIndex(pub u8);

impl SkinIndex {
    /// Number of distinct pooled skins.
    pub const POOL_SIZE: u8 = 8;

    /// Reserved skin for players who joined while the pool was empty.
    pub const OVERFLOW: Self = Self(Self::POOL_SIZE);

    /// Returns `true` if this index belongs to the allocatable pool.
    pub fn is_pooled(self) -> bool {
        self.0 < Self::POOL_SIZE
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A point on the playfield. `x` and `z` are independent plane coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    /// Returns `true` if both coordinates are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.z.is_finite()
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// Client → server envelope: a string tag plus an untyped payload.
///
/// ```json
/// { "type": "collect", "data": { "id": 5 } }
/// ```
///
/// `data` is kept as a raw [`serde_json::Value`] on purpose: shape
/// validation belongs to [`RoomMessage::parse`](crate::RoomMessage::parse)
/// so that a bad payload is a per-message rejection, not a decode failure
/// of the whole frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientFrame {
    #[serde(rename = "type")]
    pub tag: String,

    #[serde(default)]
    pub data: serde_json::Value,
}

/// Server → client frames.
///
/// Internally tagged, so `Welcome` becomes
/// `{ "type": "Welcome", "session_id": "..." }`. `S` is the snapshot type
/// published after every processing step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame<S = serde_json::Value> {
    /// Sent once after the connection joined the room.
    Welcome { session_id: SessionId },

    /// Full authoritative state after a processing step.
    State { state: S },

    /// A message was rejected. `code` follows HTTP conventions.
    Error { code: u16, message: String },
}
