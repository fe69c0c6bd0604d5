//! Error types for the room layer.

use orchard_protocol::{ProtocolError, SessionId};
use orchard_world::WorldError;

/// Errors that can occur while a room handles an event.
///
/// Every variant is local to the event that produced it: the room keeps
/// running and the world is unchanged.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The connection cap is reached.
    #[error("room is full ({0} clients)")]
    RoomFull(usize),

    /// The session is already a member of this room.
    #[error("session {0} already in room")]
    AlreadyInRoom(SessionId),

    /// The session is not a member of this room.
    #[error("session {0} not in room")]
    NotInRoom(SessionId),

    /// The room's lifecycle doesn't allow this operation,
    /// e.g. a message after disposal.
    #[error("invalid room state for this operation: {0}")]
    InvalidState(String),

    /// The message payload failed validation.
    #[error(transparent)]
    Rejected(#[from] ProtocolError),

    /// The world refused the mutation.
    #[error(transparent)]
    World(#[from] WorldError),

    /// The room's command channel is full or closed.
    #[error("room is unavailable")]
    Unavailable,
}

impl RoomError {
    /// HTTP-style status code reported back to the client.
    pub fn code(&self) -> u16 {
        match self {
            Self::RoomFull(_) | Self::Unavailable => 503,
            Self::AlreadyInRoom(_) | Self::InvalidState(_) => 409,
            Self::NotInRoom(_) => 404,
            Self::Rejected(e) => e.code(),
            Self::World(e) => e.code(),
        }
    }
}
