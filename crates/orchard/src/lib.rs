//! # Orchard
//!
//! Hosts one authoritative arena room behind a WebSocket listener.
//!
//! Every connection gets an opaque session id, joins the room, and from
//! then on receives the full world state after each processing step.
//! Clients speak tag-keyed JSON frames:
//!
//! ```json
//! { "type": "move", "data": { "x": 3, "z": -7 } }
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use orchard::prelude::*;
//!
//! # async fn start() -> Result<(), OrchardError> {
//! let server = OrchardServer::builder()
//!     .bind("0.0.0.0:2567")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::OrchardError;
pub use server::{OrchardServer, OrchardServerBuilder};

pub mod prelude {
    pub use crate::{ConfigError, OrchardError, OrchardServer, OrchardServerBuilder, ServerConfig};
    pub use orchard_protocol::{
        ClientFrame, Codec, JsonCodec, PickupId, Position, ServerFrame, SessionId, SkinIndex,
    };
    pub use orchard_room::{RoomConfig, RoomHandle, RoomInfo, RoomLifecycle};
    pub use orchard_world::{SkinFallback, SkinRelease, WorldConfig, WorldSnapshot};
}
