//! `WorldState`: the aggregate that owns all game data of one room.

use std::collections::{BTreeMap, HashSet};

use orchard_protocol::{PickupId, Position, SessionId, SkinIndex};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{ColorPool, SkinFallback, SkinRelease, WorldConfig, WorldError};

/// Pickups a player must collect to gain one detail level.
const SCORE_PER_DETAIL: u32 = 3;

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// A connected player.
///
/// Fields are read-only from outside the crate: score and detail level
/// move together and only [`WorldState`] may change them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    #[serde(flatten)]
    position: Position,
    detail_count: u32,
    skin: SkinIndex,
    score: u32,
}

impl Player {
    fn new(position: Position, skin: SkinIndex) -> Self {
        Self {
            position,
            detail_count: 0,
            skin,
            score: 0,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Visual level derived from the score: `score / 3`, rounded down.
    pub fn detail_count(&self) -> u32 {
        self.detail_count
    }

    pub fn skin(&self) -> SkinIndex {
        self.skin
    }

    pub fn score(&self) -> u32 {
        self.score
    }
}

/// A collectible apple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pickup {
    id: PickupId,
    #[serde(flatten)]
    position: Position,
}

impl Pickup {
    pub fn id(&self) -> PickupId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }
}

// ---------------------------------------------------------------------------
// Operation outcomes
// ---------------------------------------------------------------------------

/// Result of a successful collection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collected {
    pub pickup: PickupId,
    /// Where the pickup was moved to.
    pub relocated_to: Position,
    pub score: u32,
    pub detail_count: u32,
}

/// Result of [`WorldState::eliminate_player`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Elimination {
    /// The id was already cooling down. Nothing changed.
    Duplicate,
    /// The id entered the cooldown record. The caller owns expiring it
    /// after [`WorldConfig::elimination_cooldown`].
    Applied {
        /// `false` if no live player had this id.
        removed: bool,
        /// Ids of the pickups spawned at the drop positions, in order.
        drops: Vec<PickupId>,
    },
}

/// Serializable view of the world, published to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub players: BTreeMap<SessionId, Player>,
    pub apples: Vec<Pickup>,
}

// ---------------------------------------------------------------------------
// WorldState
// ---------------------------------------------------------------------------

/// The authoritative world of one room.
///
/// Invariants:
/// - pickup ids are strictly increasing and never reused;
/// - a pooled skin is in the [`ColorPool`] iff no player holds it
///   (with [`SkinRelease::Retain`], departed players keep theirs);
/// - a failed operation leaves the world untouched.
pub struct WorldState {
    config: WorldConfig,
    players: BTreeMap<SessionId, Player>,
    /// Ordered by id; ids are issued sequentially and never removed.
    pickups: Vec<Pickup>,
    next_pickup_id: PickupId,
    pool: ColorPool,
    eliminated: HashSet<SessionId>,
    rng: StdRng,
}

impl WorldState {
    /// Creates an empty world seeded from the OS.
    pub fn new(config: WorldConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Creates an empty world driven by a caller-supplied RNG.
    pub fn with_rng(config: WorldConfig, rng: StdRng) -> Self {
        Self {
            config: config.validated(),
            players: BTreeMap::new(),
            pickups: Vec::new(),
            next_pickup_id: PickupId(0),
            pool: ColorPool::full(),
            eliminated: HashSet::new(),
            rng,
        }
    }

    /// Spawns the initial pickup population.
    pub fn populate(&mut self) {
        for _ in 0..self.config.initial_pickups {
            self.create_pickup();
        }
        tracing::debug!(pickups = self.pickups.len(), "world populated");
    }

    // -- Players ------------------------------------------------------------

    /// Adds a player with a skin from the pool at a random spawn point.
    ///
    /// An empty pool is not an error for the caller: the configured
    /// [`SkinFallback`] picks the skin and a warning is logged.
    ///
    /// # Errors
    /// [`WorldError::PlayerAlreadyPresent`] if `id` is already playing.
    pub fn create_player(&mut self, id: SessionId) -> Result<&Player, WorldError> {
        if self.players.contains_key(&id) {
            return Err(WorldError::PlayerAlreadyPresent(id));
        }

        let skin = match self.pool.allocate(&mut self.rng) {
            Ok(skin) => skin,
            Err(WorldError::SkinPoolExhausted) => {
                let skin = match self.config.skin_fallback {
                    SkinFallback::Overflow => SkinIndex::OVERFLOW,
                    SkinFallback::Shared => {
                        SkinIndex(self.rng.random_range(0..SkinIndex::POOL_SIZE))
                    }
                };
                tracing::warn!(
                    player = %id,
                    ?skin,
                    policy = ?self.config.skin_fallback,
                    "skin pool exhausted, using fallback skin"
                );
                skin
            }
            Err(other) => return Err(other),
        };

        let position = self.random_position();
        let player = self
            .players
            .entry(id)
            .or_insert_with(|| Player::new(position, skin));
        Ok(&*player)
    }

    /// Removes a player. Absent ids are ignored.
    pub fn remove_player(&mut self, id: &SessionId) -> Option<Player> {
        let player = self.players.remove(id)?;

        if self.config.skin_release == SkinRelease::Return {
            let still_worn = self.players.values().any(|p| p.skin == player.skin);
            if !still_worn {
                self.pool.release(player.skin);
            }
        }
        Some(player)
    }

    /// Overwrites a player's position. No bounds or distance checks.
    ///
    /// # Errors
    /// [`WorldError::PlayerNotFound`] if `id` is not playing.
    pub fn move_player(&mut self, id: &SessionId, position: Position) -> Result<(), WorldError> {
        let player = self
            .players
            .get_mut(id)
            .ok_or_else(|| WorldError::PlayerNotFound(id.clone()))?;
        player.position = position;
        Ok(())
    }

    pub fn player(&self, id: &SessionId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn players(&self) -> impl Iterator<Item = (&SessionId, &Player)> {
        self.players.iter()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    // -- Pickups ------------------------------------------------------------

    /// Spawns a pickup at a random position.
    pub fn create_pickup(&mut self) -> PickupId {
        let position = self.random_position();
        self.create_pickup_at(position)
    }

    /// Spawns a pickup at an exact position.
    pub fn create_pickup_at(&mut self, position: Position) -> PickupId {
        let id = self.next_pickup_id;
        self.next_pickup_id = id.next();
        self.pickups.push(Pickup { id, position });
        id
    }

    /// `player` collects `pickup`.
    ///
    /// The pickup is relocated (it keeps its id), the player scores one
    /// point and their detail level is recomputed. A missing pickup is a
    /// no-op and yields `Ok(None)`.
    ///
    /// # Errors
    /// [`WorldError::PlayerNotFound`] if `player` is not playing.
    pub fn collect_pickup(
        &mut self,
        player: &SessionId,
        pickup: PickupId,
    ) -> Result<Option<Collected>, WorldError> {
        if !self.players.contains_key(player) {
            return Err(WorldError::PlayerNotFound(player.clone()));
        }
        let Ok(index) = self.pickups.binary_search_by_key(&pickup, |p| p.id) else {
            return Ok(None);
        };

        let old = self.pickups[index].position;
        let mut relocated_to = self.random_position();
        while relocated_to == old {
            relocated_to = self.random_position();
        }
        self.pickups[index].position = relocated_to;

        let collector = self
            .players
            .get_mut(player)
            .ok_or_else(|| WorldError::PlayerNotFound(player.clone()))?;
        collector.score += 1;
        collector.detail_count = collector.score / SCORE_PER_DETAIL;

        Ok(Some(Collected {
            pickup,
            relocated_to,
            score: collector.score,
            detail_count: collector.detail_count,
        }))
    }

    pub fn pickup(&self, id: PickupId) -> Option<&Pickup> {
        self.pickups
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|index| &self.pickups[index])
    }

    pub fn pickups(&self) -> &[Pickup] {
        &self.pickups
    }

    /// The id the next spawned pickup will get.
    pub fn next_pickup_id(&self) -> PickupId {
        self.next_pickup_id
    }

    // -- Elimination --------------------------------------------------------

    /// Eliminates `id` and spawns one pickup per drop position.
    ///
    /// Idempotent while `id` is cooling down. The caller is responsible for
    /// calling [`expire_elimination`](Self::expire_elimination) once
    /// [`WorldConfig::elimination_cooldown`] has elapsed.
    pub fn eliminate_player(&mut self, id: &SessionId, drops: &[Position]) -> Elimination {
        if self.eliminated.contains(id) {
            return Elimination::Duplicate;
        }
        self.eliminated.insert(id.clone());

        let removed = self.remove_player(id).is_some();
        let drops = drops
            .iter()
            .map(|position| self.create_pickup_at(*position))
            .collect();

        Elimination::Applied { removed, drops }
    }

    /// Ends the cooldown of `id`. Returns `false` if it wasn't cooling down.
    pub fn expire_elimination(&mut self, id: &SessionId) -> bool {
        self.eliminated.remove(id)
    }

    pub fn is_cooling_down(&self, id: &SessionId) -> bool {
        self.eliminated.contains(id)
    }

    // -- Misc ---------------------------------------------------------------

    pub fn pool(&self) -> &ColorPool {
        &self.pool
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Clones the client-visible state.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            players: self.players.clone(),
            apples: self.pickups.clone(),
        }
    }

    fn random_position(&mut self) -> Position {
        let range = i64::from(self.config.playfield_range);
        let half = self.config.half_range();
        let x = self.rng.random_range(0..range) - half;
        let z = self.rng.random_range(0..range) - half;
        Position::new(x as f64, z as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> WorldState {
        WorldState::with_rng(WorldConfig::default(), StdRng::seed_from_u64(42))
    }

    fn sid(id: &str) -> SessionId {
        SessionId::from(id)
    }

    #[test]
    fn test_new_world_is_empty() {
        let w = world();
        assert_eq!(w.player_count(), 0);
        assert!(w.pickups().is_empty());
        assert_eq!(w.pool().remaining(), 8);
        assert_eq!(w.next_pickup_id(), PickupId(0));
    }

    #[test]
    fn test_create_player_rejects_duplicate_id_without_leaking_skin() {
        let mut w = world();
        w.create_player(sid("a")).unwrap();
        let err = w.create_player(sid("a")).unwrap_err();
        assert_eq!(err, WorldError::PlayerAlreadyPresent(sid("a")));
        assert_eq!(w.pool().remaining(), 7);
    }

    #[test]
    fn test_overflow_fallback_when_pool_empty() {
        let mut w = world();
        for i in 0..8 {
            w.create_player(sid(&format!("p{i}"))).unwrap();
        }
        let skin = w.create_player(sid("late")).unwrap().skin();
        assert_eq!(skin, SkinIndex::OVERFLOW);
    }

    #[test]
    fn test_shared_fallback_reuses_pooled_skin() {
        let config = WorldConfig {
            skin_fallback: SkinFallback::Shared,
            ..WorldConfig::default()
        };
        let mut w = WorldState::with_rng(config, StdRng::seed_from_u64(3));
        for i in 0..8 {
            w.create_player(sid(&format!("p{i}"))).unwrap();
        }
        let skin = w.create_player(sid("late")).unwrap().skin();
        assert!(skin.is_pooled());

        // The shared skin only returns once both wearers are gone.
        let other = w
            .players()
            .find(|(id, p)| id.as_str() != "late" && p.skin() == skin)
            .map(|(id, _)| id.clone())
            .unwrap();
        w.remove_player(&other);
        assert!(!w.pool().contains(skin));
        w.remove_player(&sid("late"));
        assert!(w.pool().contains(skin));
    }

    #[test]
    fn test_remove_player_returns_skin_by_default() {
        let mut w = world();
        let skin = w.create_player(sid("a")).unwrap().skin();
        assert!(!w.pool().contains(skin));
        w.remove_player(&sid("a"));
        assert!(w.pool().contains(skin));
    }

    #[test]
    fn test_remove_player_retain_policy_keeps_skin_out_of_pool() {
        let config = WorldConfig {
            skin_release: SkinRelease::Retain,
            ..WorldConfig::default()
        };
        let mut w = WorldState::with_rng(config, StdRng::seed_from_u64(5));
        let skin = w.create_player(sid("a")).unwrap().skin();
        w.remove_player(&sid("a"));
        assert!(!w.pool().contains(skin));
        assert_eq!(w.pool().remaining(), 7);
    }

    #[test]
    fn test_overflow_skin_never_enters_pool() {
        let mut w = world();
        for i in 0..9 {
            w.create_player(sid(&format!("p{i}"))).unwrap();
        }
        w.remove_player(&sid("p8"));
        assert!(!w.pool().contains(SkinIndex::OVERFLOW));
        assert!(w.pool().is_empty());
    }

    #[test]
    fn test_move_player_overwrites_verbatim() {
        let mut w = world();
        w.create_player(sid("a")).unwrap();
        w.move_player(&sid("a"), Position::new(1000.5, -3.0)).unwrap();
        assert_eq!(
            w.player(&sid("a")).unwrap().position(),
            Position::new(1000.5, -3.0)
        );
    }

    #[test]
    fn test_move_missing_player_is_not_found() {
        let mut w = world();
        let err = w.move_player(&sid("ghost"), Position::default()).unwrap_err();
        assert_eq!(err, WorldError::PlayerNotFound(sid("ghost")));
    }

    #[test]
    fn test_collect_with_missing_player_changes_nothing() {
        let mut w = world();
        w.populate();
        let before = w.snapshot();
        assert!(w.collect_pickup(&sid("ghost"), PickupId(0)).is_err());
        assert_eq!(w.snapshot(), before);
    }

    #[test]
    fn test_detail_count_steps_every_three_points() {
        let mut w = world();
        w.populate();
        w.create_player(sid("a")).unwrap();
        let details: Vec<u32> = (0..7)
            .map(|_| {
                w.collect_pickup(&sid("a"), PickupId(0))
                    .unwrap()
                    .unwrap()
                    .detail_count
            })
            .collect();
        assert_eq!(details, vec![0, 0, 1, 1, 1, 2, 2]);
    }

    #[test]
    fn test_eliminate_absent_player_still_drops_and_cools_down() {
        let mut w = world();
        let outcome = w.eliminate_player(&sid("gone"), &[Position::new(1.0, 1.0)]);
        assert_eq!(
            outcome,
            Elimination::Applied {
                removed: false,
                drops: vec![PickupId(0)],
            }
        );
        assert!(w.is_cooling_down(&sid("gone")));
    }

    #[test]
    fn test_expire_elimination_is_one_shot() {
        let mut w = world();
        w.eliminate_player(&sid("a"), &[]);
        assert!(w.expire_elimination(&sid("a")));
        assert!(!w.expire_elimination(&sid("a")));
    }

    #[test]
    fn test_snapshot_json_uses_client_field_names() {
        let mut w = world();
        w.create_player(sid("a")).unwrap();
        w.create_pickup_at(Position::new(2.0, 3.0));
        let json = serde_json::to_value(w.snapshot()).unwrap();

        let player = &json["players"]["a"];
        assert!(player["x"].is_number());
        assert!(player["z"].is_number());
        assert_eq!(player["detailCount"], 0);
        assert_eq!(player["score"], 0);
        assert!(player["skin"].is_number());

        assert_eq!(json["apples"][0]["id"], 0);
        assert_eq!(json["apples"][0]["x"], 2.0);
    }
}
