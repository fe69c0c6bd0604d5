//! Room lifecycle and message dispatch for Orchard.
//!
//! A room is one isolated game world. Its [`RoomController`] translates
//! lifecycle and message events into [`WorldState`](orchard_world::WorldState)
//! mutations; the room actor runs the controller inside a single Tokio
//! task so every event is handled to completion, in arrival order.
//!
//! # Key types
//!
//! - [`RoomController`]: join/leave/move/collect/gameOver/dispose
//! - [`RoomLifecycle`]: `Created → Active → Disposed`
//! - [`CooldownTimers`]: cancellable elimination-cooldown expiries
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomConfig`]: connection cap, channel size, world settings

mod config;
mod controller;
mod error;
mod room;
mod timers;

pub use config::{RoomConfig, RoomLifecycle};
pub use controller::RoomController;
pub use error::RoomError;
pub use room::{ClientSender, RoomHandle, RoomInfo, RoomOutbound, spawn_room, spawn_room_with_world};
pub use timers::CooldownTimers;
