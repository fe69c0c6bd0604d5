//! Error types for the world model.

use orchard_protocol::SessionId;

/// Errors raised by [`WorldState`](crate::WorldState) operations.
///
/// None of these leave the world half-mutated: an operation that returns
/// `Err` has not changed anything.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The session id does not belong to a live player.
    #[error("player {0} not found")]
    PlayerNotFound(SessionId),

    /// A player with this session id already exists.
    #[error("player {0} already present")]
    PlayerAlreadyPresent(SessionId),

    /// Every pooled skin is held by a player.
    #[error("skin pool exhausted")]
    SkinPoolExhausted,
}

impl WorldError {
    /// HTTP-style status code reported back to the client.
    pub fn code(&self) -> u16 {
        match self {
            Self::PlayerNotFound(_) => 404,
            Self::PlayerAlreadyPresent(_) => 409,
            Self::SkinPoolExhausted => 503,
        }
    }
}
