//! Unified error type for the Orchard server.

use orchard_protocol::ProtocolError;
use orchard_room::RoomError;

use crate::ConfigError;

/// Top-level error wrapping every crate-specific error.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum OrchardError {
    /// Frame encoding or decoding failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The room refused an operation or is gone.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Binding or accepting sockets failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The WebSocket handshake or stream failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
