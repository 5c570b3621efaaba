use huddle_core::ErrorCode;
use huddle_server::ConnectionState;
use std::time::Duration;

use crate::utils::{NEGOTIATION_TIMEOUT, TestRoom, id, ids, init_tracing};

fn state(room: &TestRoom, owner: &str, remote: &str) -> Option<ConnectionState> {
    room.coordinator
        .snapshot()
        .connection(&id(owner), &id(remote))
        .map(|c| c.state)
}

const PAST_DEADLINE: Duration = NEGOTIATION_TIMEOUT.saturating_add(Duration::from_secs(1));

#[tokio::test(start_paused = true)]
async fn test_negotiation_timeout_closes_without_touching_roster() {
    init_tracing();
    let mut room = TestRoom::new(8);
    room.join("a").unwrap();
    room.join("b").unwrap();

    let fired = room.advance(PAST_DEADLINE).await;

    assert_eq!(fired, 2);
    assert_eq!(state(&room, "a", "b"), Some(ConnectionState::Closed));
    assert_eq!(state(&room, "b", "a"), Some(ConnectionState::Closed));
    assert_eq!(
        room.output.errors_for(&id("a")),
        vec![ErrorCode::NegotiationTimeout]
    );
    assert_eq!(room.output.closed_peers_for(&id("b")), vec![id("a")]);
    assert_eq!(room.coordinator.member_count(), 2);
    assert_eq!(room.output.rosters_for(&id("a")).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_connected_pair_has_no_deadline() {
    let mut room = TestRoom::new(8);
    room.join("a").unwrap();
    room.join("b").unwrap();
    assert!(room.track("a", "b"));
    assert!(room.track("b", "a"));

    let fired = room.advance(PAST_DEADLINE).await;

    assert_eq!(fired, 0);
    assert_eq!(state(&room, "a", "b"), Some(ConnectionState::Connected));
    assert!(room.output.errors_for(&id("a")).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timeout_retry_is_bounded() {
    let mut room = TestRoom::new(8);
    room.join("a").unwrap();
    room.join("b").unwrap();
    room.advance(PAST_DEADLINE).await;

    room.join("c").unwrap();
    assert_eq!(state(&room, "a", "b"), Some(ConnectionState::Negotiating));

    room.advance(PAST_DEADLINE).await;
    assert_eq!(state(&room, "a", "b"), Some(ConnectionState::Closed));

    room.join("d").unwrap();
    assert_eq!(state(&room, "a", "b"), Some(ConnectionState::Closed));
    assert_eq!(state(&room, "a", "c"), Some(ConnectionState::Negotiating));
    assert_eq!(
        room.output.offer_cues_for(&id("a")),
        ids(&["b", "b", "c", "c", "d"])
    );
}

#[tokio::test(start_paused = true)]
async fn test_departure_cancels_pending_deadlines() {
    let mut room = TestRoom::new(8);
    room.join("a").unwrap();
    room.join("b").unwrap();

    room.leave("b").unwrap();
    let fired = room.advance(PAST_DEADLINE).await;

    assert_eq!(fired, 0);
    assert!(room.output.errors_for(&id("a")).is_empty());
}
