//! Server configuration, loaded from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use orchard_room::RoomConfig;
use orchard_world::{SkinFallback, SkinRelease};

/// Longest accepted elimination cooldown, one day.
const MAX_COOLDOWN_SECS: u64 = 24 * 60 * 60;

/// Configuration for an Orchard server process.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,
    /// Settings of the single room this process hosts.
    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:2567".to_string(),
            room: RoomConfig::default(),
        }
    }
}

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}: invalid value {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ServerConfig {
    /// Reads configuration from the process environment.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `ORCHARD_BIND` | `127.0.0.1:2567` |
    /// | `ORCHARD_MAX_CLIENTS` | `4` |
    /// | `ORCHARD_PLAYFIELD_RANGE` | `128` |
    /// | `ORCHARD_INITIAL_PICKUPS` | `100` |
    /// | `ORCHARD_COOLDOWN_SECS` | `10` (at most `86400`) |
    /// | `ORCHARD_SKIN_RELEASE` | `return` (or `retain`) |
    /// | `ORCHARD_SKIN_FALLBACK` | `overflow` (or `shared`) |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(addr) = get("ORCHARD_BIND") {
            addr.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
                key: "ORCHARD_BIND",
                value: addr.clone(),
                reason: "expected host:port",
            })?;
            config.bind_addr = addr;
        }
        if let Some(raw) = get("ORCHARD_MAX_CLIENTS") {
            config.room.max_clients = parse_number("ORCHARD_MAX_CLIENTS", raw)?;
        }
        if let Some(raw) = get("ORCHARD_PLAYFIELD_RANGE") {
            config.room.world.playfield_range = parse_number("ORCHARD_PLAYFIELD_RANGE", raw)?;
        }
        if let Some(raw) = get("ORCHARD_INITIAL_PICKUPS") {
            config.room.world.initial_pickups = parse_number("ORCHARD_INITIAL_PICKUPS", raw)?;
        }
        if let Some(raw) = get("ORCHARD_COOLDOWN_SECS") {
            let secs: u64 = parse_number("ORCHARD_COOLDOWN_SECS", raw.clone())?;
            if secs > MAX_COOLDOWN_SECS {
                return Err(ConfigError::Invalid {
                    key: "ORCHARD_COOLDOWN_SECS",
                    value: raw,
                    reason: "must be at most 86400 seconds",
                });
            }
            config.room.world.elimination_cooldown = Duration::from_secs(secs);
        }
        if let Some(raw) = get("ORCHARD_SKIN_RELEASE") {
            config.room.world.skin_release = match raw.to_ascii_lowercase().as_str() {
                "return" => SkinRelease::Return,
                "retain" => SkinRelease::Retain,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "ORCHARD_SKIN_RELEASE",
                        value: raw,
                        reason: "expected `return` or `retain`",
                    });
                }
            };
        }
        if let Some(raw) = get("ORCHARD_SKIN_FALLBACK") {
            config.room.world.skin_fallback = match raw.to_ascii_lowercase().as_str() {
                "overflow" => SkinFallback::Overflow,
                "shared" => SkinFallback::Shared,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "ORCHARD_SKIN_FALLBACK",
                        value: raw,
                        reason: "expected `overflow` or `shared`",
                    });
                }
            };
        }

        if config.room.max_clients == 0 {
            return Err(ConfigError::Invalid {
                key: "ORCHARD_MAX_CLIENTS",
                value: "0".into(),
                reason: "must be at least 1",
            });
        }
        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: String) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw,
        reason: "expected a non-negative integer",
    })
}
