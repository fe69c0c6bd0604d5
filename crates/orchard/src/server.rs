//! `OrchardServer` builder and accept loop.
//!
//! Ties the layers together: TCP listener → WebSocket handshake →
//! per-connection handler → room actor.

use std::future::Future;
use std::sync::Arc;

use orchard_protocol::{Codec, JsonCodec};
use orchard_room::{RoomConfig, RoomHandle, spawn_room};
use tokio::net::TcpListener;

use crate::handler::handle_connection;
use crate::{OrchardError, ServerConfig};

/// Shared state passed to each connection task.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) room: RoomHandle,
    pub(crate) codec: C,
}

/// Builder for configuring and starting an Orchard server.
pub struct OrchardServerBuilder {
    config: ServerConfig,
}

impl OrchardServerBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the room configuration.
    pub fn room_config(mut self, room: RoomConfig) -> Self {
        self.config.room = room;
        self
    }

    /// Binds the listener and creates the room.
    ///
    /// The room is active, with its initial population, before this
    /// returns: no connection can see it half-built.
    pub async fn build(self) -> Result<OrchardServer<JsonCodec>, OrchardError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        let room = spawn_room(self.config.room)?;
        tracing::info!(addr = %self.config.bind_addr, "orchard listening");

        Ok(OrchardServer {
            listener,
            state: Arc::new(ServerState {
                room,
                codec: JsonCodec,
            }),
        })
    }
}

impl Default for OrchardServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Orchard server hosting one room.
pub struct OrchardServer<C: Codec> {
    listener: TcpListener,
    state: Arc<ServerState<C>>,
}

impl OrchardServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> OrchardServerBuilder {
        OrchardServerBuilder::new()
    }
}

impl<C: Codec> OrchardServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// A handle to the hosted room.
    pub fn room(&self) -> RoomHandle {
        self.state.room.clone()
    }

    /// Accepts connections until the process is terminated.
    pub async fn run(self) -> Result<(), OrchardError> {
        self.run_until(std::future::pending()).await
    }

    /// Accepts connections until `shutdown` resolves, then disposes the
    /// room (cancelling its pending timers).
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<(), OrchardError> {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, addr, state).await {
                                tracing::debug!(%addr, error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
            }
        }

        self.state.room.dispose().await?;
        Ok(())
    }
}
