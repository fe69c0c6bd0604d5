//! Error types for the protocol layer.

/// Errors that can occur while decoding frames or validating payloads.
///
/// A `ProtocolError` never says anything about world state: it means the
/// bytes or the payload shape were wrong, and the message should be
/// rejected without touching the room.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization of a frame failed (malformed JSON, missing fields).
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame carried a tag no handler is registered for.
    #[error("unknown message tag {0:?}")]
    UnknownTag(String),

    /// The payload for a known tag had the wrong shape or types.
    #[error("bad request for {tag:?}: {reason}")]
    BadRequest {
        tag: &'static str,
        reason: String,
    },
}

impl ProtocolError {
    pub(crate) fn bad_request(tag: &'static str, reason: impl ToString) -> Self {
        Self::BadRequest {
            tag,
            reason: reason.to_string(),
        }
    }

    /// HTTP-style status code reported back to the client.
    pub fn code(&self) -> u16 {
        match self {
            Self::Encode(_) => 500,
            Self::Decode(_) | Self::UnknownTag(_) | Self::BadRequest { .. } => 400,
        }
    }
}
