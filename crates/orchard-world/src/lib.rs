//! The authoritative world model of an Orchard room.
//!
//! [`WorldState`] owns every piece of game data a room has: connected
//! players, pickups, the skin pool and the elimination cooldown record.
//! It knows nothing about sessions, sockets or timers; it only mutates
//! itself and reports what happened.
//!
//! # Key types
//!
//! - [`WorldState`]: the aggregate and all its mutation operations
//! - [`ColorPool`]: the finite set of unallocated skins
//! - [`WorldConfig`]: playfield size, population, cooldown, skin policies
//! - [`WorldSnapshot`]: the serializable view published to clients

mod config;
mod error;
mod pool;
mod world;

pub use config::{SkinFallback, SkinRelease, WorldConfig};
pub use error::WorldError;
pub use pool::ColorPool;
pub use world::{Collected, Elimination, Pickup, Player, WorldSnapshot, WorldState};
