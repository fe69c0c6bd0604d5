//! Per-tag payload schemas.
//!
//! The substrate hands every client message over as `(tag, untyped
//! payload)`. Nothing downstream ever looks at the raw JSON: a message is
//! either parsed into a [`RoomMessage`] here or rejected with
//! [`ProtocolError::BadRequest`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{PickupId, Position, ProtocolError, SessionId};

/// The message tags a room understands.
pub mod tags {
    pub const MOVE: &str = "move";
    pub const COLLECT: &str = "collect";
    pub const GAME_OVER: &str = "gameOver";
}

/// Elimination report: who went out, and where their drops land.
///
/// ```json
/// { "id": "k3Jd9", "dPos": [{ "x": 3, "z": -8 }] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOver {
    pub id: SessionId,

    #[serde(rename = "dPos")]
    pub drops: Vec<Position>,
}

impl GameOver {
    /// Parses a `gameOver` payload.
    ///
    /// Clients send the report as a JSON *string* holding the object;
    /// an already-decoded object is accepted as well.
    pub fn from_payload(data: &Value) -> Result<Self, ProtocolError> {
        let parsed = match data {
            Value::String(raw) => serde_json::from_str::<GameOver>(raw),
            other => GameOver::deserialize(other),
        }
        .map_err(|e| ProtocolError::bad_request(tags::GAME_OVER, e))?;

        if let Some(index) = parsed.drops.iter().position(|p| !p.is_finite()) {
            return Err(ProtocolError::bad_request(
                tags::GAME_OVER,
                format!("dPos[{index}] is not a finite position"),
            ));
        }
        Ok(parsed)
    }
}

#[derive(Deserialize)]
struct CollectPayload {
    id: u64,
}

/// A validated client message, ready for the room.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomMessage {
    /// Overwrite the sender's position.
    Move(Position),
    /// The sender touched a pickup.
    Collect(PickupId),
    /// A player was eliminated and dropped pickups.
    GameOver(GameOver),
}

impl RoomMessage {
    /// Validates `data` against the schema registered for `tag`.
    ///
    /// # Errors
    /// - [`ProtocolError::UnknownTag`] if no schema exists for `tag`.
    /// - [`ProtocolError::BadRequest`] if the payload has the wrong shape.
    pub fn parse(tag: &str, data: &Value) -> Result<Self, ProtocolError> {
        match tag {
            tags::MOVE => {
                let position = Position::deserialize(data)
                    .map_err(|e| ProtocolError::bad_request(tags::MOVE, e))?;
                if !position.is_finite() {
                    return Err(ProtocolError::bad_request(
                        tags::MOVE,
                        "coordinates must be finite",
                    ));
                }
                Ok(Self::Move(position))
            }
            tags::COLLECT => Self::parse_collect(data).map(Self::Collect),
            tags::GAME_OVER => GameOver::from_payload(data).map(Self::GameOver),
            other => Err(ProtocolError::UnknownTag(other.to_owned())),
        }
    }

    /// Validates a `collect` payload and returns the targeted pickup.
    pub fn parse_collect(data: &Value) -> Result<PickupId, ProtocolError> {
        let payload = CollectPayload::deserialize(data)
            .map_err(|e| ProtocolError::bad_request(tags::COLLECT, e))?;
        Ok(PickupId(payload.id))
    }

    /// The tag this message arrived under.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Move(_) => tags::MOVE,
            Self::Collect(_) => tags::COLLECT,
            Self::GameOver(_) => tags::GAME_OVER,
        }
    }
}
