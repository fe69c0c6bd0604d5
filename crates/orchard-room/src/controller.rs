//! `RoomController`: translates room events into world mutations.
//!
//! The controller is synchronous and single-owner. It holds no game data of
//! its own, only the world it drives and the cooldown timers it scheduled.

use orchard_protocol::{GameOver, PickupId, Position, RoomMessage, SessionId, tags};
use orchard_world::{Collected, Elimination, WorldConfig, WorldSnapshot, WorldState};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{CooldownTimers, RoomError, RoomLifecycle};

/// Lifecycle and message dispatch for one room.
pub struct RoomController {
    lifecycle: RoomLifecycle,
    /// `None` once the room is disposed.
    world: Option<WorldState>,
    timers: CooldownTimers,
}

impl RoomController {
    /// Creates a controller in the `Created` state with an empty world.
    ///
    /// Cooldown expiries are reported on `expired_tx`; whoever owns the
    /// receiving end feeds them back through
    /// [`on_cooldown_expired`](Self::on_cooldown_expired).
    pub fn new(config: WorldConfig, expired_tx: mpsc::UnboundedSender<SessionId>) -> Self {
        Self::with_world(WorldState::new(config), expired_tx)
    }

    /// Creates a controller around an existing (usually seeded) world.
    pub fn with_world(world: WorldState, expired_tx: mpsc::UnboundedSender<SessionId>) -> Self {
        Self {
            lifecycle: RoomLifecycle::Created,
            world: Some(world),
            timers: CooldownTimers::new(expired_tx),
        }
    }

    /// `Created → Active`: spawns the initial pickup population.
    ///
    /// # Errors
    /// [`RoomError::InvalidState`] if the room is not in `Created`.
    pub fn activate(&mut self) -> Result<(), RoomError> {
        if !self.lifecycle.can_transition_to(RoomLifecycle::Active) {
            return Err(RoomError::InvalidState(format!(
                "cannot activate room in state {}",
                self.lifecycle
            )));
        }
        let world = self.world.as_mut().ok_or_else(|| {
            RoomError::InvalidState("room has no world".into())
        })?;
        world.populate();
        self.lifecycle = RoomLifecycle::Active;
        tracing::info!(pickups = world.pickups().len(), "room active");
        Ok(())
    }

    // -- Lifecycle events ---------------------------------------------------

    /// A session joined. Always succeeds for a fresh id, even when the
    /// skin pool is empty (the world applies its fallback skin).
    pub fn on_join(&mut self, id: SessionId) -> Result<(), RoomError> {
        let world = self.active_world()?;
        let player = world.create_player(id.clone())?;
        tracing::info!(
            session = %id,
            skin = player.skin().0,
            x = player.position().x,
            z = player.position().z,
            "player joined"
        );
        Ok(())
    }

    /// A session left. Unknown ids are ignored.
    pub fn on_leave(&mut self, id: &SessionId) -> Result<(), RoomError> {
        let world = self.active_world()?;
        match world.remove_player(id) {
            Some(player) => {
                tracing::info!(session = %id, score = player.score(), "player left")
            }
            None => tracing::debug!(session = %id, "leave for absent player"),
        }
        Ok(())
    }

    /// Tears the room down: cancels every pending timer, releases the world.
    /// Safe to call more than once.
    pub fn on_dispose(&mut self) {
        if self.lifecycle == RoomLifecycle::Disposed {
            return;
        }
        let cancelled = self.timers.cancel_all();
        self.world = None;
        self.lifecycle = RoomLifecycle::Disposed;
        tracing::info!(cancelled_timers = cancelled, "room disposed");
    }

    /// A cooldown timer fired for `id`.
    pub fn on_cooldown_expired(&mut self, id: &SessionId) {
        if !self.timers.complete(id) {
            tracing::debug!(session = %id, "stale cooldown expiry ignored");
            return;
        }
        if let Some(world) = self.world.as_mut() {
            world.expire_elimination(id);
            tracing::debug!(session = %id, "elimination cooldown expired");
        }
    }

    // -- Message events -----------------------------------------------------

    /// Validates a tagged payload and dispatches it.
    pub fn on_message(
        &mut self,
        sender: &SessionId,
        tag: &str,
        data: &Value,
    ) -> Result<(), RoomError> {
        self.active_world()?;
        match RoomMessage::parse(tag, data) {
            Ok(msg) => self.dispatch(sender, msg),
            Err(e) => {
                tracing::warn!(session = %sender, tag, error = %e, "message rejected");
                Err(e.into())
            }
        }
    }

    /// Dispatches an already-validated message.
    pub fn dispatch(&mut self, sender: &SessionId, msg: RoomMessage) -> Result<(), RoomError> {
        match msg {
            RoomMessage::Move(position) => self.move_player(sender, position),
            RoomMessage::Collect(pickup) => self.collect(sender, pickup).map(|_| ()),
            RoomMessage::GameOver(report) => self.game_over(report).map(|_| ()),
        }
    }

    /// `move` handler: `{x, z}`.
    pub fn on_move(&mut self, sender: &SessionId, payload: &Value) -> Result<(), RoomError> {
        self.on_message(sender, tags::MOVE, payload)
    }

    /// `collect` handler: `{id}`. Returns the collection result, or `None`
    /// if the pickup doesn't exist.
    pub fn on_collect(
        &mut self,
        sender: &SessionId,
        payload: &Value,
    ) -> Result<Option<Collected>, RoomError> {
        self.active_world()?;
        let pickup = RoomMessage::parse_collect(payload)?;
        self.collect(sender, pickup)
    }

    /// `gameOver` handler: JSON string `{id, dPos}`.
    pub fn on_game_over(&mut self, payload: &Value) -> Result<Elimination, RoomError> {
        self.active_world()?;
        let report = GameOver::from_payload(payload)?;
        self.game_over(report)
    }

    fn move_player(&mut self, sender: &SessionId, position: Position) -> Result<(), RoomError> {
        let world = self.active_world()?;
        world.move_player(sender, position).map_err(|e| {
            tracing::warn!(session = %sender, error = %e, "move dropped");
            RoomError::from(e)
        })
    }

    fn collect(
        &mut self,
        sender: &SessionId,
        pickup: PickupId,
    ) -> Result<Option<Collected>, RoomError> {
        let world = self.active_world()?;
        let collected = world.collect_pickup(sender, pickup).map_err(|e| {
            tracing::warn!(session = %sender, %pickup, error = %e, "collect dropped");
            RoomError::from(e)
        })?;
        match &collected {
            Some(c) => tracing::debug!(
                session = %sender,
                %pickup,
                score = c.score,
                detail = c.detail_count,
                "pickup collected"
            ),
            None => tracing::debug!(session = %sender, %pickup, "collect for unknown pickup"),
        }
        Ok(collected)
    }

    fn game_over(&mut self, report: GameOver) -> Result<Elimination, RoomError> {
        let world = self.active_world()?;
        let cooldown = world.config().elimination_cooldown;
        let outcome = world.eliminate_player(&report.id, &report.drops);

        match &outcome {
            Elimination::Duplicate => {
                tracing::debug!(session = %report.id, "duplicate gameOver absorbed");
            }
            Elimination::Applied { removed, drops } => {
                tracing::info!(
                    session = %report.id,
                    removed,
                    drops = drops.len(),
                    "player eliminated"
                );
                self.timers.schedule(report.id, cooldown);
            }
        }
        Ok(outcome)
    }

    // -- Accessors ----------------------------------------------------------

    pub fn lifecycle(&self) -> RoomLifecycle {
        self.lifecycle
    }

    /// The world, unless the room has been disposed.
    pub fn world(&self) -> Option<&WorldState> {
        self.world.as_ref()
    }

    pub fn snapshot(&self) -> Option<WorldSnapshot> {
        self.world.as_ref().map(WorldState::snapshot)
    }

    /// Number of cooldown timers still pending.
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    fn active_world(&mut self) -> Result<&mut WorldState, RoomError> {
        if !self.lifecycle.is_active() {
            return Err(RoomError::InvalidState(format!(
                "room is {}",
                self.lifecycle
            )));
        }
        self.world
            .as_mut()
            .ok_or_else(|| RoomError::InvalidState("room has no world".into()))
    }
}
