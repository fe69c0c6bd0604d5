//! Room actor: an isolated Tokio task that owns a [`RoomController`].
//!
//! The outside world talks to the room through an mpsc channel; cooldown
//! timers report back through a second channel. Both are drained by the
//! same loop, so every event runs to completion before the next starts.

use std::collections::HashMap;
use std::sync::Arc;

use orchard_protocol::SessionId;
use orchard_world::{WorldSnapshot, WorldState};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::{RoomConfig, RoomController, RoomError, RoomLifecycle};

/// An outbound message from the room actor to one client's connection.
#[derive(Debug, Clone)]
pub enum RoomOutbound {
    /// Authoritative state after a processing step.
    State(Arc<WorldSnapshot>),
    /// A message this client sent was rejected.
    Rejected { code: u16, message: String },
}

/// Channel sender for delivering outbound messages to a client.
pub type ClientSender = mpsc::UnboundedSender<RoomOutbound>;

/// Commands sent to a room actor through its channel.
///
/// Variants carrying a `oneshot::Sender` expect a reply.
pub(crate) enum RoomCommand {
    Join {
        session_id: SessionId,
        sender: ClientSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    Leave {
        session_id: SessionId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// A tagged client message with its untyped payload.
    Message {
        sender: SessionId,
        tag: String,
        data: Value,
    },

    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },

    GetSnapshot {
        reply: oneshot::Sender<Option<Arc<WorldSnapshot>>>,
    },

    Dispose,
}

/// Room metadata (not the world itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub lifecycle: RoomLifecycle,
    /// Connected sessions.
    pub client_count: usize,
    /// Sessions with a live player in the world.
    pub player_count: usize,
    pub pickup_count: usize,
    pub max_clients: usize,
}

/// Handle to a running room actor.
///
/// Cheap to clone; every connection task holds one.
#[derive(Clone)]
pub struct RoomHandle {
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Joins a session. `sender` receives every published state.
    pub async fn join(
        &self,
        session_id: SessionId,
        sender: ClientSender,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            session_id,
            sender,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)?
    }

    /// Removes a session.
    pub async fn leave(&self, session_id: SessionId) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Leave {
            session_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)?
    }

    /// Delivers a client message (fire-and-forget). Rejections come back
    /// on the sender's [`ClientSender`] as [`RoomOutbound::Rejected`].
    pub async fn send_message(
        &self,
        sender: SessionId,
        tag: impl Into<String>,
        data: Value,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Message {
            sender,
            tag: tag.into(),
            data,
        })
        .await
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// The current world snapshot, or `None` once disposed.
    pub async fn snapshot(&self) -> Result<Option<Arc<WorldSnapshot>>, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::GetSnapshot { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| RoomError::Unavailable)
    }

    /// Disposes the room and stops the actor.
    pub async fn dispose(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Dispose).await
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable)
    }
}

/// The internal actor state. Runs inside a Tokio task.
struct RoomActor {
    config: RoomConfig,
    controller: RoomController,
    /// Per-session outbound channels.
    clients: HashMap<SessionId, ClientSender>,
    receiver: mpsc::Receiver<RoomCommand>,
    expired_rx: mpsc::UnboundedReceiver<SessionId>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!("room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else {
                        tracing::debug!("all room handles dropped");
                        break;
                    };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                Some(id) = self.expired_rx.recv() => {
                    self.controller.on_cooldown_expired(&id);
                }
            }
        }

        self.controller.on_dispose();
        tracing::info!("room actor stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                session_id,
                sender,
                reply,
            } => {
                let result = self.handle_join(session_id, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Leave { session_id, reply } => {
                let result = self.handle_leave(session_id);
                let _ = reply.send(result);
            }
            RoomCommand::Message { sender, tag, data } => {
                self.handle_message(sender, &tag, &data);
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::GetSnapshot { reply } => {
                let _ = reply.send(self.controller.snapshot().map(Arc::new));
            }
            RoomCommand::Dispose => {
                tracing::info!("room disposing");
                return false;
            }
        }
        true
    }

    fn handle_join(
        &mut self,
        session_id: SessionId,
        sender: ClientSender,
    ) -> Result<(), RoomError> {
        if self.clients.contains_key(&session_id) {
            return Err(RoomError::AlreadyInRoom(session_id));
        }
        if self.clients.len() >= self.config.max_clients {
            return Err(RoomError::RoomFull(self.config.max_clients));
        }

        self.controller.on_join(session_id.clone())?;
        self.clients.insert(session_id, sender);
        self.publish();
        Ok(())
    }

    fn handle_leave(&mut self, session_id: SessionId) -> Result<(), RoomError> {
        if self.clients.remove(&session_id).is_none() {
            return Err(RoomError::NotInRoom(session_id));
        }
        self.controller.on_leave(&session_id)?;
        self.publish();
        Ok(())
    }

    fn handle_message(&mut self, sender: SessionId, tag: &str, data: &Value) {
        if !self.clients.contains_key(&sender) {
            tracing::warn!(session = %sender, tag, "message from non-member, ignoring");
            return;
        }

        match self.controller.on_message(&sender, tag, data) {
            Ok(()) => self.publish(),
            Err(e) => self.send_to(
                &sender,
                RoomOutbound::Rejected {
                    code: e.code(),
                    message: e.to_string(),
                },
            ),
        }
    }

    /// Sends the current snapshot to every connected client.
    fn publish(&self) {
        let Some(snapshot) = self.controller.snapshot() else {
            return;
        };
        let outbound = RoomOutbound::State(Arc::new(snapshot));
        for id in self.clients.keys() {
            self.send_to(id, outbound.clone());
        }
    }

    /// Drops the message if the client's receiver is gone.
    fn send_to(&self, id: &SessionId, msg: RoomOutbound) {
        if let Some(sender) = self.clients.get(id) {
            let _ = sender.send(msg);
        }
    }

    fn info(&self) -> RoomInfo {
        let world = self.controller.world();
        RoomInfo {
            lifecycle: self.controller.lifecycle(),
            client_count: self.clients.len(),
            player_count: world.map_or(0, WorldState::player_count),
            pickup_count: world.map_or(0, |w| w.pickups().len()),
            max_clients: self.config.max_clients,
        }
    }
}

/// Creates a room, activates it, and spawns its actor task.
///
/// The initial pickup population exists before the handle is returned,
/// so no client can observe an empty world.
pub fn spawn_room(config: RoomConfig) -> Result<RoomHandle, RoomError> {
    let world = WorldState::new(config.world.clone());
    spawn_room_with_world(config, world)
}

/// Like [`spawn_room`], around a caller-built (e.g. seeded) world.
pub fn spawn_room_with_world(
    config: RoomConfig,
    world: WorldState,
) -> Result<RoomHandle, RoomError> {
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));
    let (expired_tx, expired_rx) = mpsc::unbounded_channel();

    let mut controller = RoomController::with_world(world, expired_tx);
    controller.activate()?;

    let actor = RoomActor {
        config,
        controller,
        clients: HashMap::new(),
        receiver: rx,
        expired_rx,
    };
    tokio::spawn(actor.run());

    Ok(RoomHandle { sender: tx })
}
