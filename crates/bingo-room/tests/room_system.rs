//! Integration tests for room actors and the registry.
//!
//! Timing tests run with paused Tokio time: the runtime jumps straight to
//! the next countdown whenever every task is idle, so a 20 s pre-draw delay
//! costs nothing and elapsed times are exact.

use std::collections::HashSet;
use std::time::Duration;

use bingo_draw::NumberSpace;
use bingo_protocol::{RoomId, ServerEvent};
use bingo_room::{ClaimRejection, GameConfig, RoomError, RoomHandle, RoomRegistry, RoomState};
use bingo_session::event_channel;
use bingo_transport::ConnectionId;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

// =========================================================================
// Helpers
// =========================================================================

fn cid(id: u64) -> ConnectionId {
    ConnectionId::new(id)
}

fn room_id(raw: &str) -> RoomId {
    RoomId::normalize(raw).unwrap()
}

/// Small, seeded config. Manual start unless a test opts in.
fn config() -> GameConfig {
    GameConfig {
        space: NumberSpace::new(1, 10).unwrap(),
        card_size: 3,
        auto_start_when_full: false,
        seed: Some(42),
        ..GameConfig::default()
    }
}

fn registry(config: GameConfig) -> RoomRegistry {
    RoomRegistry::new(config).unwrap()
}

async fn join(
    room: &RoomHandle,
    id: u64,
    name: &str,
) -> Result<UnboundedReceiver<ServerEvent>, RoomError> {
    let (tx, rx) = event_channel();
    room.join(cid(id), name, tx).await?;
    Ok(rx)
}

/// Everything already queued for a client.
fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Waits for the next event, letting paused time advance as needed.
async fn next_event(rx: &mut UnboundedReceiver<ServerEvent>) -> ServerEvent {
    tokio::time::timeout(Duration::from_secs(300), rx.recv())
        .await
        .expect("no event within 300s")
        .expect("channel closed")
}

/// Skips events until one matches.
async fn wait_for(
    rx: &mut UnboundedReceiver<ServerEvent>,
    pred: impl Fn(&ServerEvent) -> bool,
) -> ServerEvent {
    loop {
        let event = next_event(rx).await;
        if pred(&event) {
            return event;
        }
    }
}

async fn wait_until_gone(registry: &RoomRegistry, id: &RoomId) {
    for _ in 0..100 {
        if registry.get(id).await.is_none() && !registry.room_ids().await.contains(id) {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("room {id} was not torn down");
}

fn card_of(event: &ServerEvent) -> Vec<u16> {
    match event {
        ServerEvent::RoomJoined { card, .. } => card.clone(),
        other => panic!("expected room_joined, got {other:?}"),
    }
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test]
async fn test_first_joiner_is_admin_and_roster_keeps_join_order() {
    let reg = registry(config());
    let room = reg.get_or_create(room_id("r1"), Some(4)).await.unwrap();

    let mut a = join(&room, 1, "Ana").await.unwrap();
    let mut b = join(&room, 2, "Bia").await.unwrap();

    let a_events = drain(&mut a);
    assert!(matches!(
        &a_events[0],
        ServerEvent::RoomJoined { is_admin: true, limit: 4, card, .. } if card.len() == 3
    ));
    assert_eq!(
        a_events.last().unwrap(),
        &ServerEvent::UpdatePlayers {
            count: 2,
            limit: 4,
            players: vec!["Ana".into(), "Bia".into()],
            admin: Some("Ana".into()),
        }
    );

    let b_events = drain(&mut b);
    assert!(matches!(
        &b_events[0],
        ServerEvent::RoomJoined { is_admin: false, .. }
    ));
    assert!(matches!(&b_events[1], ServerEvent::UpdatePlayers { count: 2, .. }));

    let info = room.info();
    assert_eq!(info.state, RoomState::Lobby);
    assert_eq!(info.admin.as_deref(), Some("Ana"));
    assert_eq!(info.players, vec!["Ana", "Bia"]);
}

#[tokio::test]
async fn test_cards_are_subsets_of_the_space() {
    let reg = registry(config());
    let room = reg.get_or_create(room_id("r1"), Some(10)).await.unwrap();
    for id in 1..=10 {
        let mut rx = join(&room, id, &format!("p{id}")).await.unwrap();
        let card = card_of(&drain(&mut rx)[0]);
        assert_eq!(card.len(), 3);
        assert!(card.iter().all(|n| (1..=10).contains(n)));
        assert_eq!(card.iter().collect::<HashSet<_>>().len(), 3);
    }
}

#[tokio::test]
async fn test_join_rejects_when_full() {
    let reg = registry(config());
    let room = reg.get_or_create(room_id("r1"), Some(2)).await.unwrap();
    join(&room, 1, "Ana").await.unwrap();
    join(&room, 2, "Bia").await.unwrap();

    let err = join(&room, 3, "Caio").await.unwrap_err();
    assert_eq!(err, RoomError::RoomFull(room_id("R1")));
    assert_eq!(room.info().member_count(), 2);
}

#[tokio::test]
async fn test_duplicate_name_is_case_insensitive() {
    let reg = registry(config());
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();
    join(&room, 1, "Ana").await.unwrap();

    let err = join(&room, 2, "  ANA ").await.unwrap_err();
    assert_eq!(err, RoomError::DuplicateName("ANA".into()));
}

#[tokio::test]
async fn test_invalid_name_rejected_first() {
    let reg = registry(config());
    let room = reg.get_or_create(room_id("r1"), Some(1)).await.unwrap();
    join(&room, 1, "Ana").await.unwrap();

    // Full room, but the name check comes first.
    let err = join(&room, 2, "   ").await.unwrap_err();
    assert_eq!(err, RoomError::InvalidName);
}

#[tokio::test]
async fn test_same_connection_cannot_join_twice() {
    let reg = registry(config());
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();
    join(&room, 1, "Ana").await.unwrap();

    let err = join(&room, 1, "Other").await.unwrap_err();
    assert_eq!(err, RoomError::AlreadyInRoom(room_id("r1")));
}

#[tokio::test]
async fn test_join_while_running_rejected() {
    let reg = registry(config());
    let room = reg.get_or_create(room_id("r1"), Some(4)).await.unwrap();
    join(&room, 1, "Ana").await.unwrap();
    room.start(cid(1)).await.unwrap();

    let err = join(&room, 2, "Bia").await.unwrap_err();
    assert_eq!(err, RoomError::AlreadyRunning(room_id("r1")));
}

#[tokio::test]
async fn test_room_starts_when_full() {
    let reg = registry(GameConfig {
        auto_start_when_full: true,
        ..config()
    });
    let room = reg.get_or_create(room_id("r1"), Some(2)).await.unwrap();
    let mut a = join(&room, 1, "Ana").await.unwrap();
    join(&room, 2, "Bia").await.unwrap();

    assert_eq!(room.info().state, RoomState::Spinning);
    let events = drain(&mut a);
    assert!(events.contains(&ServerEvent::GameStarted {}));
    assert_eq!(events.last(), Some(&ServerEvent::SpinningStart {}));

    // Still full: capacity is reported before the running game.
    let err = join(&room, 3, "Caio").await.unwrap_err();
    assert_eq!(err, RoomError::RoomFull(room_id("r1")));
}

// =========================================================================
// Leaving
// =========================================================================

#[tokio::test]
async fn test_leave_of_non_member_is_noop() {
    let reg = registry(config());
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();
    let mut a = join(&room, 1, "Ana").await.unwrap();
    drain(&mut a);

    assert!(!room.leave(cid(99)).await.unwrap());
    assert_eq!(room.info().member_count(), 1);
    assert!(drain(&mut a).is_empty());
}

#[tokio::test]
async fn test_admin_leaving_promotes_next_oldest() {
    let reg = registry(config());
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();
    join(&room, 1, "Ana").await.unwrap();
    let mut b = join(&room, 2, "Bia").await.unwrap();
    join(&room, 3, "Caio").await.unwrap();
    drain(&mut b);

    assert!(room.leave(cid(1)).await.unwrap());

    assert_eq!(
        drain(&mut b),
        vec![ServerEvent::UpdatePlayers {
            count: 2,
            limit: 20,
            players: vec!["Bia".into(), "Caio".into()],
            admin: Some("Bia".into()),
        }]
    );
    assert_eq!(room.info().admin.as_deref(), Some("Bia"));
    assert!(!room.is_closed());

    // The promoted admin can start.
    room.start(cid(2)).await.unwrap();
}

#[tokio::test]
async fn test_last_leave_tears_room_down() {
    let reg = registry(config());
    let id = room_id("r1");
    let room = reg.get_or_create(id.clone(), None).await.unwrap();
    join(&room, 1, "Ana").await.unwrap();
    room.start(cid(1)).await.unwrap();

    assert!(room.leave(cid(1)).await.unwrap());
    wait_until_gone(&reg, &id).await;

    assert!(reg.is_empty().await);
    assert!(matches!(
        join(&room, 2, "Bia").await,
        Err(RoomError::Unavailable(_))
    ));

    // Same id again gets a fresh room.
    let fresh = reg.get_or_create(id, None).await.unwrap();
    assert_ne!(fresh.instance(), room.instance());
    join(&fresh, 2, "Bia").await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_game_continues_after_a_player_leaves() {
    let reg = registry(config());
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();
    let mut a = join(&room, 1, "Ana").await.unwrap();
    join(&room, 2, "Bia").await.unwrap();
    room.start(cid(1)).await.unwrap();
    room.leave(cid(2)).await.unwrap();

    wait_for(&mut a, |e| matches!(e, ServerEvent::NumberDrawn { .. })).await;
    assert_eq!(room.info().drawn, 1);
}

// =========================================================================
// Starting and drawing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_admin_starts_and_first_number_follows_pre_draw_delay() {
    let reg = registry(config());
    let room = reg.get_or_create(room_id("R1"), Some(4)).await.unwrap();
    let mut a = join(&room, 1, "A").await.unwrap();
    let mut b = join(&room, 2, "B").await.unwrap();
    drain(&mut a);
    drain(&mut b);

    assert_eq!(room.start(cid(2)).await, Err(RoomError::NotAdmin));
    assert_eq!(room.info().state, RoomState::Lobby);

    let started = Instant::now();
    room.start(cid(1)).await.unwrap();
    assert_eq!(room.info().state, RoomState::Spinning);
    assert_eq!(
        drain(&mut b),
        vec![ServerEvent::GameStarted {}, ServerEvent::SpinningStart {}]
    );

    let ServerEvent::NumberDrawn { number } = next_event(&mut b).await else {
        panic!("expected number_drawn");
    };
    assert_eq!(started.elapsed(), Duration::from_secs(20));
    assert!((1..=10).contains(&number));

    let info = room.info();
    assert_eq!(info.drawn, 1);
    assert_eq!(info.state, RoomState::NumberRevealed);

    // Reveal pacing, then a regular spin.
    assert_eq!(next_event(&mut b).await, ServerEvent::SpinningStart {});
    assert_eq!(started.elapsed(), Duration::from_secs(32));
    assert!(matches!(next_event(&mut b).await, ServerEvent::NumberDrawn { .. }));
    assert_eq!(started.elapsed(), Duration::from_secs(36));
}

#[tokio::test]
async fn test_start_twice_rejected() {
    let reg = registry(config());
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();
    join(&room, 1, "Ana").await.unwrap();
    room.start(cid(1)).await.unwrap();
    assert_eq!(
        room.start(cid(1)).await,
        Err(RoomError::AlreadyRunning(room_id("r1")))
    );
}

#[tokio::test]
async fn test_start_by_non_member_rejected() {
    let reg = registry(config());
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();
    join(&room, 1, "Ana").await.unwrap();
    assert_eq!(
        room.start(cid(5)).await,
        Err(RoomError::NotInRoom(room_id("r1")))
    );
}

#[tokio::test(start_paused = true)]
async fn test_full_game_draws_each_number_once_then_ends_without_winner() {
    let reg = registry(config());
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();
    let mut a = join(&room, 1, "Ana").await.unwrap();
    room.start(cid(1)).await.unwrap();

    let mut drawn = Vec::new();
    let winner = loop {
        match next_event(&mut a).await {
            ServerEvent::NumberDrawn { number } => drawn.push(number),
            ServerEvent::GameOver { winner } => break winner,
            _ => {}
        }
    };

    assert_eq!(winner, None);
    assert_eq!(drawn.len(), 10);
    assert_eq!(drawn.iter().collect::<HashSet<_>>().len(), 10);
    assert_eq!(room.info().state, RoomState::GameOver);
    assert_eq!(room.info().winner, None);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_ends_game_at_reveal_without_extra_spin() {
    let reg = registry(GameConfig {
        space: NumberSpace::new(1, 2).unwrap(),
        card_size: 1,
        ..config()
    });
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();
    let mut a = join(&room, 1, "Ana").await.unwrap();
    drain(&mut a);

    let started = Instant::now();
    room.start(cid(1)).await.unwrap();

    let mut timeline = Vec::new();
    loop {
        let event = next_event(&mut a).await;
        let done = matches!(event, ServerEvent::GameOver { .. });
        timeline.push((started.elapsed().as_secs(), event.name()));
        if done {
            break;
        }
    }

    assert_eq!(
        timeline,
        vec![
            (0, "game_started"),
            (0, "spinning_start"),
            (20, "number_drawn"),
            (32, "spinning_start"),
            (36, "number_drawn"),
            (48, "game_over"),
        ]
    );
    assert_eq!(room.info().state, RoomState::GameOver);
    assert!(drain(&mut a).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_countdown_ticks_when_configured() {
    let reg = registry(GameConfig {
        countdown_interval: Some(Duration::from_secs(5)),
        ..config()
    });
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();
    let mut a = join(&room, 1, "Ana").await.unwrap();
    room.start(cid(1)).await.unwrap();
    drain(&mut a);

    let mut seen = Vec::new();
    loop {
        match next_event(&mut a).await {
            ServerEvent::Countdown { remaining_secs } => seen.push(remaining_secs),
            ServerEvent::NumberDrawn { .. } => break,
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(seen, vec![15, 10, 5]);
}

// =========================================================================
// Claims
// =========================================================================

/// Every card holds the whole space, so a card is complete exactly when
/// the last number is drawn.
fn full_card_config() -> GameConfig {
    GameConfig {
        space: NumberSpace::new(1, 5).unwrap(),
        card_size: 5,
        ..config()
    }
}

async fn draw_until(rx: &mut UnboundedReceiver<ServerEvent>, count: usize) {
    for _ in 0..count {
        wait_for(rx, |e| matches!(e, ServerEvent::NumberDrawn { .. })).await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_claim_before_game_rejected() {
    let reg = registry(full_card_config());
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();
    join(&room, 1, "Ana").await.unwrap();
    assert_eq!(
        room.shout_bingo(cid(1), vec![]).await,
        Err(RoomError::LateOrInvalidClaim(ClaimRejection::NoGameRunning))
    );
}

#[tokio::test(start_paused = true)]
async fn test_incomplete_claim_leaves_game_running() {
    let reg = registry(full_card_config());
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();
    let mut a = join(&room, 1, "Ana").await.unwrap();
    room.start(cid(1)).await.unwrap();
    draw_until(&mut a, 2).await;

    // Claims numbers that were never drawn; the server judges the card.
    assert_eq!(
        room.shout_bingo(cid(1), vec![1, 2, 3, 4, 5]).await,
        Err(RoomError::LateOrInvalidClaim(ClaimRejection::CardIncomplete))
    );
    let info = room.info();
    assert_eq!(info.state, RoomState::NumberRevealed);
    assert_eq!(info.drawn, 2);
    assert!(drain(&mut a).is_empty(), "rejection must not be broadcast");
}

#[tokio::test(start_paused = true)]
async fn test_first_valid_claim_wins_second_is_late() {
    let reg = registry(full_card_config());
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();
    let mut a = join(&room, 1, "Ana").await.unwrap();
    let mut b = join(&room, 2, "Bia").await.unwrap();
    room.start(cid(1)).await.unwrap();
    draw_until(&mut a, 5).await;
    drain(&mut b);

    room.shout_bingo(cid(2), vec![1, 2, 3, 4, 5]).await.unwrap();
    assert_eq!(
        room.shout_bingo(cid(1), vec![1, 2, 3, 4, 5]).await,
        Err(RoomError::LateOrInvalidClaim(ClaimRejection::TooLate))
    );

    let over = ServerEvent::GameOver {
        winner: Some("Bia".into()),
    };
    assert_eq!(drain(&mut b), vec![over.clone()]);
    assert_eq!(drain(&mut a), vec![over]);

    let info = room.info();
    assert_eq!(info.state, RoomState::GameOver);
    assert_eq!(info.winner.as_deref(), Some("Bia"));
}

#[tokio::test(start_paused = true)]
async fn test_game_over_returns_to_lobby_with_fresh_cards() {
    let reg = registry(full_card_config());
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();
    let mut a = join(&room, 1, "Ana").await.unwrap();
    room.start(cid(1)).await.unwrap();
    draw_until(&mut a, 5).await;
    room.shout_bingo(cid(1), vec![]).await.unwrap();
    drain(&mut a);

    let over_at = Instant::now();
    let rejoined = next_event(&mut a).await;
    assert_eq!(over_at.elapsed(), Duration::from_secs(30));
    assert!(matches!(
        rejoined,
        ServerEvent::RoomJoined { is_admin: true, ref card, .. } if card.len() == 5
    ));
    assert!(matches!(
        next_event(&mut a).await,
        ServerEvent::UpdatePlayers { count: 1, .. }
    ));

    let info = room.info();
    assert_eq!(info.state, RoomState::Lobby);
    assert_eq!(info.drawn, 0);
    assert_eq!(info.winner, None);

    // And a new game can begin.
    room.start(cid(1)).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_join_and_start_between_games_report_game_over() {
    let reg = registry(full_card_config());
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();
    let mut a = join(&room, 1, "Ana").await.unwrap();
    room.start(cid(1)).await.unwrap();
    draw_until(&mut a, 5).await;
    room.shout_bingo(cid(1), vec![]).await.unwrap();

    let between = RoomError::BetweenGames(room_id("r1"));
    assert_eq!(join(&room, 2, "Bia").await.err(), Some(between.clone()));
    assert_eq!(room.start(cid(1)).await, Err(between));
    assert_eq!(room.info().state, RoomState::GameOver);
}

// =========================================================================
// Registry
// =========================================================================

#[tokio::test]
async fn test_get_or_create_returns_one_room_under_contention() {
    let reg = registry(config());
    let mut tasks = Vec::new();
    for _ in 0..16 {
        let reg = reg.clone();
        tasks.push(tokio::spawn(async move {
            reg.get_or_create(room_id("busy"), None).await.unwrap().instance()
        }));
    }
    let mut instances = HashSet::new();
    for task in tasks {
        instances.insert(task.await.unwrap());
    }
    assert_eq!(instances.len(), 1);
    assert_eq!(reg.len().await, 1);
}

#[tokio::test]
async fn test_limit_validated_only_on_create() {
    let reg = registry(config());
    assert_eq!(
        reg.get_or_create(room_id("r1"), Some(0)).await.unwrap_err(),
        RoomError::InvalidLimit { limit: 0, max: 100 }
    );
    assert!(reg.get_or_create(room_id("r1"), Some(101)).await.is_err());
    assert!(reg.is_empty().await);

    let room = reg.get_or_create(room_id("r1"), Some(3)).await.unwrap();
    let again = reg.get_or_create(room_id("r1"), Some(0)).await.unwrap();
    assert_eq!(room.instance(), again.instance());
    assert_eq!(again.info().limit, 3);
}

#[tokio::test]
async fn test_remove_instance_spares_newer_room() {
    let reg = registry(config());
    let id = room_id("r1");
    let old = reg.get_or_create(id.clone(), None).await.unwrap();
    assert!(reg.remove(&id).await.is_some());
    assert!(reg.remove(&id).await.is_none());

    let new = reg.get_or_create(id.clone(), None).await.unwrap();
    assert!(!reg.remove_instance(&id, old.instance()).await);
    assert_eq!(reg.get(&id).await.unwrap().instance(), new.instance());
    assert!(reg.remove_instance(&id, new.instance()).await);
    assert!(reg.is_empty().await);
}

#[tokio::test]
async fn test_list_active_reflects_occupancy() {
    let reg = registry(config());
    let r1 = reg.get_or_create(room_id("r1"), Some(4)).await.unwrap();
    let r2 = reg.get_or_create(room_id("r2"), None).await.unwrap();
    let _empty = reg.get_or_create(room_id("r3"), None).await.unwrap();

    join(&r1, 1, "Ana").await.unwrap();
    join(&r1, 2, "Bia").await.unwrap();
    join(&r2, 3, "Caio").await.unwrap();
    r2.start(cid(3)).await.unwrap();

    let entries: Vec<_> = reg
        .list_active()
        .await
        .iter()
        .map(|info| info.list_entry())
        .collect();
    assert_eq!(entries.len(), 2, "rooms without members are not listed");
    assert_eq!(entries[0].id, room_id("R1"));
    assert_eq!((entries[0].count, entries[0].limit, entries[0].active), (2, 4, false));
    assert_eq!(entries[1].id, room_id("R2"));
    assert!(entries[1].active);

    r2.leave(cid(3)).await.unwrap();
    wait_until_gone(&reg, &room_id("r2")).await;
    let ids: Vec<_> = reg.list_active().await.into_iter().map(|i| i.room_id).collect();
    assert_eq!(ids, vec![room_id("r1")]);
}

#[tokio::test]
async fn test_changes_signal_lobby_updates() {
    let reg = registry(config());
    let mut changes = reg.changes();
    let room = reg.get_or_create(room_id("r1"), None).await.unwrap();

    join(&room, 1, "Ana").await.unwrap();
    assert!(changes.has_changed().unwrap());
    changes.borrow_and_update();

    // A roster-neutral failure changes nothing.
    let _ = join(&room, 2, "ana").await;
    assert!(!changes.has_changed().unwrap());

    room.start(cid(1)).await.unwrap();
    assert!(changes.has_changed().unwrap());
}
