//! Integration tests for the room controller and the room actor.
//!
//! Cooldown tests run with paused time: sleeping auto-advances the clock
//! once every task is idle, so timer expiries are deterministic.

use std::time::Duration;

use orchard_protocol::{PickupId, Position, SessionId, SkinIndex};
use orchard_room::{
    RoomConfig, RoomController, RoomError, RoomLifecycle, RoomOutbound, spawn_room,
    spawn_room_with_world,
};
use orchard_world::{Elimination, WorldConfig, WorldError, WorldState};
use rand::{SeedableRng, rngs::StdRng};
use serde_json::{Value, json};
use tokio::sync::mpsc;

const COOLDOWN: Duration = Duration::from_secs(10);

// =========================================================================
// Helpers
// =========================================================================

fn sid(id: &str) -> SessionId {
    SessionId::from(id)
}

fn active_controller() -> (RoomController, mpsc::UnboundedReceiver<SessionId>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let world = WorldState::with_rng(WorldConfig::default(), StdRng::seed_from_u64(9));
    let mut room = RoomController::with_world(world, tx);
    room.activate().unwrap();
    (room, rx)
}

/// `gameOver` payloads arrive as a JSON string.
fn game_over(id: &str, drops: &[(f64, f64)]) -> Value {
    let d_pos: Vec<Value> = drops.iter().map(|(x, z)| json!({"x": x, "z": z})).collect();
    Value::String(json!({"id": id, "dPos": d_pos}).to_string())
}

fn client() -> (mpsc::UnboundedSender<RoomOutbound>, mpsc::UnboundedReceiver<RoomOutbound>) {
    mpsc::unbounded_channel()
}

/// Drains the client channel and returns the last message in it.
fn last_state(rx: &mut mpsc::UnboundedReceiver<RoomOutbound>) -> Option<RoomOutbound> {
    let mut last = None;
    while let Ok(msg) = rx.try_recv() {
        last = Some(msg);
    }
    last
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test]
async fn test_activate_spawns_initial_population() {
    let (room, _rx) = active_controller();
    assert_eq!(room.lifecycle(), RoomLifecycle::Active);

    let ids: Vec<u64> = room.world().unwrap().pickups().iter().map(|p| p.id().0).collect();
    assert_eq!(ids, (0..100).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_events_rejected_before_activation() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let mut room = RoomController::new(WorldConfig::default(), tx);
    assert_eq!(room.lifecycle(), RoomLifecycle::Created);

    let err = room.on_join(sid("a")).unwrap_err();
    assert!(matches!(err, RoomError::InvalidState(_)));
}

#[tokio::test]
async fn test_activate_twice_is_invalid() {
    let (mut room, _rx) = active_controller();
    assert!(matches!(room.activate(), Err(RoomError::InvalidState(_))));
    assert_eq!(room.world().unwrap().pickups().len(), 100);
}

#[tokio::test]
async fn test_dispose_releases_world_and_rejects_events() {
    let (mut room, _rx) = active_controller();
    room.on_join(sid("a")).unwrap();

    room.on_dispose();
    room.on_dispose();

    assert_eq!(room.lifecycle(), RoomLifecycle::Disposed);
    assert!(room.world().is_none());
    assert!(room.snapshot().is_none());
    assert!(matches!(
        room.on_move(&sid("a"), &json!({"x": 1, "z": 1})),
        Err(RoomError::InvalidState(_))
    ));
}

// =========================================================================
// Join / leave
// =========================================================================

#[tokio::test]
async fn test_join_beyond_pool_still_succeeds() {
    let (mut room, _rx) = active_controller();
    for i in 0..10 {
        room.on_join(sid(&format!("p{i}"))).unwrap();
    }
    let world = room.world().unwrap();
    assert_eq!(world.player_count(), 10);
    assert_eq!(world.player(&sid("p9")).unwrap().skin(), SkinIndex::OVERFLOW);
}

#[tokio::test]
async fn test_leave_unknown_session_is_noop() {
    let (mut room, _rx) = active_controller();
    room.on_join(sid("a")).unwrap();
    let before = room.snapshot();

    room.on_leave(&sid("nobody")).unwrap();

    assert_eq!(room.snapshot(), before);
}

// =========================================================================
// Messages
// =========================================================================

#[tokio::test]
async fn test_move_overwrites_position() {
    let (mut room, _rx) = active_controller();
    room.on_join(sid("a")).unwrap();

    room.on_move(&sid("a"), &json!({"x": 500, "z": -12.25})).unwrap();

    let player = room.world().unwrap().player(&sid("a")).unwrap();
    assert_eq!(player.position(), Position::new(500.0, -12.25));
}

#[tokio::test]
async fn test_move_bad_payload_leaves_state_unchanged() {
    let (mut room, _rx) = active_controller();
    room.on_join(sid("a")).unwrap();
    let before = room.snapshot();

    let err = room.on_move(&sid("a"), &json!({"x": "left"})).unwrap_err();

    assert!(matches!(err, RoomError::Rejected(_)));
    assert_eq!(err.code(), 400);
    assert_eq!(room.snapshot(), before);
}

#[tokio::test]
async fn test_move_for_missing_player_is_not_found() {
    let (mut room, _rx) = active_controller();
    let err = room.on_move(&sid("ghost"), &json!({"x": 1, "z": 2})).unwrap_err();
    assert!(matches!(err, RoomError::World(WorldError::PlayerNotFound(_))));
}

#[tokio::test]
async fn test_collect_scores_and_relocates() {
    let (mut room, _rx) = active_controller();
    room.on_join(sid("a")).unwrap();
    let before = room.world().unwrap().pickup(PickupId(5)).unwrap().position();

    let collected = room.on_collect(&sid("a"), &json!({"id": 5})).unwrap().unwrap();

    assert_eq!(collected.pickup, PickupId(5));
    assert_eq!(collected.score, 1);
    assert_eq!(collected.detail_count, 0);
    assert_ne!(room.world().unwrap().pickup(PickupId(5)).unwrap().position(), before);
}

#[tokio::test]
async fn test_collect_from_stale_session_is_dropped() {
    let (mut room, _rx) = active_controller();
    room.on_join(sid("a")).unwrap();
    room.on_leave(&sid("a")).unwrap();
    let before = room.snapshot();

    let err = room.on_collect(&sid("a"), &json!({"id": 1})).unwrap_err();

    assert_eq!(err.code(), 404);
    assert_eq!(room.snapshot(), before);
}

#[tokio::test]
async fn test_unknown_tag_rejected() {
    let (mut room, _rx) = active_controller();
    room.on_join(sid("a")).unwrap();
    let err = room.on_message(&sid("a"), "teleport", &json!({})).unwrap_err();
    assert!(matches!(err, RoomError::Rejected(_)));
}

// =========================================================================
// gameOver and the cooldown
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_game_over_drops_and_removes() {
    let (mut room, _rx) = active_controller();
    room.on_join(sid("a")).unwrap();

    let outcome = room.on_game_over(&game_over("a", &[(1.0, 2.0), (3.0, 4.0)])).unwrap();

    assert_eq!(
        outcome,
        Elimination::Applied {
            removed: true,
            drops: vec![PickupId(100), PickupId(101)],
        }
    );
    let world = room.world().unwrap();
    assert!(world.player(&sid("a")).is_none());
    assert_eq!(world.pickup(PickupId(101)).unwrap().position(), Position::new(3.0, 4.0));
    assert_eq!(room.pending_timers(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_game_over_within_cooldown_is_absorbed() {
    let (mut room, _rx) = active_controller();
    room.on_join(sid("a")).unwrap();
    let payload = game_over("a", &[(1.0, 1.0)]);
    room.on_game_over(&payload).unwrap();

    tokio::time::sleep(COOLDOWN - Duration::from_millis(1)).await;
    let outcome = room.on_game_over(&payload).unwrap();

    assert_eq!(outcome, Elimination::Duplicate);
    assert_eq!(room.world().unwrap().pickups().len(), 101);
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_expiry_clears_record() {
    let (mut room, mut expired) = active_controller();
    let payload = game_over("a", &[(1.0, 1.0)]);
    room.on_game_over(&payload).unwrap();

    let id = expired.recv().await.unwrap();
    room.on_cooldown_expired(&id);

    assert_eq!(id, sid("a"));
    assert!(!room.world().unwrap().is_cooling_down(&sid("a")));
    assert_eq!(room.pending_timers(), 0);

    let again = room.on_game_over(&payload).unwrap();
    assert!(matches!(again, Elimination::Applied { ref drops, .. } if drops == &[PickupId(101)]));
}

#[tokio::test(start_paused = true)]
async fn test_dispose_cancels_pending_timers() {
    let (mut room, mut expired) = active_controller();
    room.on_game_over(&game_over("a", &[])).unwrap();
    room.on_game_over(&game_over("b", &[])).unwrap();
    assert_eq!(room.pending_timers(), 2);

    room.on_dispose();
    tokio::time::sleep(COOLDOWN * 3).await;

    assert_eq!(room.pending_timers(), 0);
    assert!(expired.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_game_over_with_unbounded_cooldown_keeps_room_alive() {
    let (tx, _expired) = mpsc::unbounded_channel();
    let config = WorldConfig {
        elimination_cooldown: Duration::from_secs(u64::MAX),
        ..WorldConfig::default()
    };
    let world = WorldState::with_rng(config, StdRng::seed_from_u64(3));
    let mut room = RoomController::with_world(world, tx);
    room.activate().unwrap();

    let outcome = room.on_game_over(&json!({"id": "a", "dPos": []})).unwrap();

    assert!(matches!(outcome, Elimination::Applied { .. }));
    assert_eq!(room.pending_timers(), 1);
    assert!(room.world().unwrap().is_cooling_down(&sid("a")));
    room.on_join(sid("b")).unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_malformed_game_over_rejected() {
    let (mut room, _rx) = active_controller();
    room.on_join(sid("a")).unwrap();
    let before = room.snapshot();

    let err = room
        .on_game_over(&Value::String(r#"{"id":"a","dPos":[{"x":1}]}"#.into()))
        .unwrap_err();

    assert!(matches!(err, RoomError::Rejected(_)));
    assert_eq!(room.snapshot(), before);
    assert_eq!(room.pending_timers(), 0);
}

// =========================================================================
// Room actor
// =========================================================================

#[tokio::test]
async fn test_spawned_room_is_active_with_population() {
    let room = spawn_room(RoomConfig::default()).unwrap();
    let info = room.info().await.unwrap();
    assert_eq!(info.lifecycle, RoomLifecycle::Active);
    assert_eq!(info.pickup_count, 100);
    assert_eq!(info.client_count, 0);
    assert_eq!(info.max_clients, 4);
}

#[tokio::test]
async fn test_join_publishes_state_to_client() {
    let room = spawn_room(RoomConfig::default()).unwrap();
    let (tx, mut rx) = client();

    room.join(sid("a"), tx).await.unwrap();

    let Some(RoomOutbound::State(snapshot)) = rx.recv().await else {
        panic!("expected a state publication");
    };
    assert!(snapshot.players.contains_key(&sid("a")));
    assert_eq!(snapshot.apples.len(), 100);
}

#[tokio::test]
async fn test_connection_cap_enforced() {
    let room = spawn_room(RoomConfig::default()).unwrap();
    for i in 0..4 {
        room.join(sid(&format!("p{i}")), client().0).await.unwrap();
    }

    let err = room.join(sid("p4"), client().0).await.unwrap_err();
    assert!(matches!(err, RoomError::RoomFull(4)));

    room.leave(sid("p0")).await.unwrap();
    room.join(sid("p4"), client().0).await.unwrap();
}

#[tokio::test]
async fn test_duplicate_join_rejected() {
    let room = spawn_room(RoomConfig::default()).unwrap();
    room.join(sid("a"), client().0).await.unwrap();
    let err = room.join(sid("a"), client().0).await.unwrap_err();
    assert!(matches!(err, RoomError::AlreadyInRoom(_)));
}

#[tokio::test]
async fn test_messages_processed_in_order() {
    let room = spawn_room(RoomConfig::default()).unwrap();
    room.join(sid("a"), client().0).await.unwrap();

    for i in 0..50 {
        room.send_message(sid("a"), "move", json!({"x": i, "z": -i}))
            .await
            .unwrap();
    }

    let snapshot = room.snapshot().await.unwrap().unwrap();
    let position = snapshot.players[&sid("a")].position();
    assert_eq!(position, Position::new(49.0, -49.0));
}

#[tokio::test]
async fn test_rejected_message_reported_to_sender() {
    let room = spawn_room(RoomConfig::default()).unwrap();
    let (tx, mut rx) = client();
    room.join(sid("a"), tx).await.unwrap();

    room.send_message(sid("a"), "collect", json!({"id": "five"}))
        .await
        .unwrap();
    room.info().await.unwrap();

    match last_state(&mut rx) {
        Some(RoomOutbound::Rejected { code, .. }) => assert_eq!(code, 400),
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_message_from_non_member_ignored() {
    let room = spawn_room(RoomConfig::default()).unwrap();
    let before = room.snapshot().await.unwrap();

    room.send_message(sid("stranger"), "gameOver", game_over("x", &[(0.0, 0.0)]))
        .await
        .unwrap();

    assert_eq!(room.snapshot().await.unwrap(), before);
}

#[tokio::test(start_paused = true)]
async fn test_actor_cooldown_round_trip() {
    let world = WorldState::with_rng(WorldConfig::default(), StdRng::seed_from_u64(1));
    let room = spawn_room_with_world(RoomConfig::default(), world).unwrap();
    room.join(sid("a"), client().0).await.unwrap();
    room.join(sid("b"), client().0).await.unwrap();

    let report = game_over("a", &[(5.0, 5.0)]);
    room.send_message(sid("b"), "gameOver", report.clone()).await.unwrap();
    room.send_message(sid("b"), "gameOver", report.clone()).await.unwrap();
    assert_eq!(room.info().await.unwrap().pickup_count, 101);
    assert_eq!(room.info().await.unwrap().player_count, 1);

    tokio::time::sleep(COOLDOWN + Duration::from_millis(1)).await;
    room.send_message(sid("b"), "gameOver", report).await.unwrap();

    assert_eq!(room.info().await.unwrap().pickup_count, 102);
}

#[tokio::test]
async fn test_dispose_stops_actor() {
    let room = spawn_room(RoomConfig::default()).unwrap();
    room.dispose().await.unwrap();

    // Commands queued behind Dispose are dropped with the receiver.
    assert!(matches!(room.info().await, Err(RoomError::Unavailable)));
}
