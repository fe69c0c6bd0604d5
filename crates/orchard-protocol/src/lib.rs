//! Wire protocol for Orchard.
//!
//! This crate defines what travels between a hosting substrate and a room:
//!
//! - **Types** ([`SessionId`], [`PickupId`], [`SkinIndex`], [`Position`],
//!   [`ClientFrame`], [`ServerFrame`]): identities and envelopes.
//! - **Messages** ([`RoomMessage`]): the per-tag payload schemas. Client
//!   payloads arrive untyped; [`RoomMessage::parse`] is the one place they
//!   get validated.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how frames become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! bytes → ClientFrame { type, data } → RoomMessage → room
//! ```

mod codec;
mod error;
mod messages;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use messages::{GameOver, RoomMessage, tags};
pub use types::{ClientFrame, PickupId, Position, ServerFrame, SessionId, SkinIndex};
