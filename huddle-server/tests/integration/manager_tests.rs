use anyhow::{Context, Result};
use huddle_core::{
    ControlCommand, ErrorCode, MediaProfile, RoomId, ServerMessage, SignalEnvelope,
};
use huddle_server::{ConnectionState, CoordinatorError, RoomManager};

use crate::utils::{answer, create_test_manager, id, init_tracing, offer};

async fn join(manager: &RoomManager, who: &str, room: Option<&str>) -> Result<RoomId, CoordinatorError> {
    manager
        .join(
            id(who),
            who.to_uppercase(),
            room.map(RoomId::from),
            MediaProfile::default(),
        )
        .await
        .map(|(room_id, _)| room_id)
}

async fn wait_for_room_count(manager: &RoomManager, expected: usize) {
    for _ in 0..100 {
        if manager.room_count() == expected {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!(
        "expected {} rooms, found {}",
        expected,
        manager.room_count()
    );
}

#[tokio::test]
async fn test_assignment_fills_rooms_in_order() -> Result<()> {
    init_tracing();
    let (manager, output) = create_test_manager(2);

    let first = join(&manager, "a", None).await?;
    let second = join(&manager, "b", None).await?;
    let third = join(&manager, "c", None).await?;

    assert_eq!(first, second);
    assert_ne!(first, third);
    assert_eq!(manager.room_count(), 2);
    assert_eq!(manager.room_of(&id("c")), Some(third.clone()));
    assert!(output.messages_for(&id("c")).contains(&ServerMessage::RoomAssigned {
        room_id: third,
    }));
    Ok(())
}

#[tokio::test]
async fn test_named_full_room_rejects_join() {
    let (manager, _output) = create_test_manager(1);
    join(&manager, "a", Some("lobby")).await.unwrap();

    let err = join(&manager, "b", Some("lobby")).await.unwrap_err();

    assert_eq!(err, CoordinatorError::RoomFull(RoomId::from("lobby")));
    assert_eq!(manager.room_of(&id("b")), None);
}

#[tokio::test]
async fn test_duplicate_join_across_rooms() {
    let (manager, _output) = create_test_manager(4);
    join(&manager, "a", Some("x")).await.unwrap();

    let err = join(&manager, "a", Some("y")).await.unwrap_err();

    assert_eq!(err, CoordinatorError::DuplicateJoin(id("a")));
    assert_eq!(manager.room_count(), 1);
    assert_eq!(manager.room_of(&id("a")), Some(RoomId::from("x")));
}

#[tokio::test]
async fn test_room_closes_after_last_leave() {
    let (manager, _output) = create_test_manager(4);
    let first = join(&manager, "a", None).await.unwrap();

    let outcome = manager.leave(&id("a")).await.unwrap();

    assert!(outcome.room_empty);
    wait_for_room_count(&manager, 0).await;
    assert_eq!(manager.room_of(&id("a")), None);

    let second = join(&manager, "a", None).await.unwrap();
    assert_ne!(first, second);
}

#[tokio::test]
async fn test_signals_flow_through_the_room() -> Result<()> {
    let (manager, output) = create_test_manager(4);
    let room_id = join(&manager, "a", None).await?;
    join(&manager, "b", None).await?;

    manager
        .signal(SignalEnvelope::new(id("a"), id("b"), offer()))
        .await?;
    manager.track_received(&id("b"), id("a")).await?;

    let snapshot = manager
        .snapshot(&room_id)
        .await
        .context("room closed before snapshot")?;
    assert_eq!(
        snapshot.connection(&id("b"), &id("a")).map(|c| c.state),
        Some(ConnectionState::Connected)
    );
    assert_eq!(output.signals_for(&id("b")), vec![(id("a"), offer())]);
    assert_eq!(output.offer_cues_for(&id("a")), vec![id("b")]);
    Ok(())
}

#[tokio::test]
async fn test_rejected_signal_is_reported_to_sender() {
    let (manager, output) = create_test_manager(4);
    let room_id = join(&manager, "a", None).await.unwrap();
    join(&manager, "b", None).await.unwrap();
    manager.connection_failed(&id("a"), id("b")).await.unwrap();

    manager
        .signal(SignalEnvelope::new(id("a"), id("b"), answer()))
        .await
        .unwrap();
    manager.snapshot(&room_id).await.unwrap();

    assert_eq!(
        output.errors_for(&id("a")),
        vec![ErrorCode::InvalidSignalTarget]
    );
}

#[tokio::test]
async fn test_non_members_are_rejected_or_ignored() {
    let (manager, output) = create_test_manager(4);
    join(&manager, "a", None).await.unwrap();

    let control = manager
        .control(
            &id("ghost"),
            ControlCommand::Mute {
                target_id: id("a"),
                duration_seconds: 5,
            },
        )
        .await;
    let leave = manager.leave(&id("ghost")).await;
    let signal = manager
        .signal(SignalEnvelope::new(id("ghost"), id("a"), offer()))
        .await;

    assert_eq!(control, Err(CoordinatorError::NotFound(id("ghost"))));
    assert_eq!(leave, Err(CoordinatorError::NotFound(id("ghost"))));
    assert_eq!(signal, Ok(()));
    assert!(output.signals_for(&id("a")).is_empty());
}

#[tokio::test]
async fn test_shutdown_tears_down_every_room() {
    let (manager, output) = create_test_manager(2);
    join(&manager, "a", None).await.unwrap();
    join(&manager, "b", None).await.unwrap();
    join(&manager, "c", None).await.unwrap();

    manager.shutdown().await;

    assert_eq!(manager.room_count(), 0);
    assert_eq!(manager.room_of(&id("a")), None);
    assert_eq!(output.closed_peers_for(&id("a")), vec![id("b")]);
    assert_eq!(output.closed_peers_for(&id("b")), vec![id("a")]);
}

#[tokio::test]
async fn test_oversized_control_leaves_room_usable() -> Result<()> {
    let (manager, output) = create_test_manager(8);
    let room_id = join(&manager, "a", None).await?;
    join(&manager, "b", None).await?;

    manager
        .control(
            &id("a"),
            ControlCommand::Mute {
                target_id: id("b"),
                duration_seconds: u64::MAX,
            },
        )
        .await?;
    let snapshot = manager
        .snapshot(&room_id)
        .await
        .context("room closed after control")?;

    assert!(snapshot.constraints.is_empty());
    assert_eq!(output.errors_for(&id("a")), vec![ErrorCode::BadRequest]);

    manager.leave(&id("a")).await?;
    assert_eq!(join(&manager, "a", None).await?, room_id);
    Ok(())
}
