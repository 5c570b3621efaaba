use huddle_core::{Role, SignalPayload};
use huddle_server::{ConnectionState, CoordinatorError, SignalOutcome};

use crate::utils::{TestRoom, answer, candidate, id, ids, init_tracing, offer};

fn state(room: &TestRoom, owner: &str, remote: &str) -> Option<ConnectionState> {
    room.coordinator
        .snapshot()
        .connection(&id(owner), &id(remote))
        .map(|c| c.state)
}

#[tokio::test]
async fn test_two_peers_negotiate_and_connect() {
    init_tracing();
    let mut room = TestRoom::new(8);

    room.join("a").unwrap();
    assert_eq!(room.output.rosters_for(&id("a")), vec![ids(&["a"])]);
    room.join("b").unwrap();
    assert_eq!(room.output.last_roster_for(&id("a")), Some(ids(&["a", "b"])));
    assert_eq!(room.output.last_roster_for(&id("b")), Some(ids(&["a", "b"])));

    let snapshot = room.coordinator.snapshot();
    let ab = snapshot.connection(&id("a"), &id("b")).unwrap();
    let ba = snapshot.connection(&id("b"), &id("a")).unwrap();
    assert_eq!(ab.role, Role::Initiator);
    assert_eq!(ab.state, ConnectionState::Negotiating);
    assert_eq!(ba.role, Role::Responder);
    assert_eq!(ba.state, ConnectionState::New);
    assert_eq!(room.output.offer_cues_for(&id("a")), vec![id("b")]);
    assert!(room.output.offer_cues_for(&id("b")).is_empty());

    assert_eq!(room.signal("a", "b", offer()), Ok(SignalOutcome::Delivered));
    assert_eq!(room.output.signals_for(&id("b")), vec![(id("a"), offer())]);
    assert_eq!(state(&room, "b", "a"), Some(ConnectionState::Negotiating));

    assert_eq!(room.signal("b", "a", answer()), Ok(SignalOutcome::Delivered));
    assert_eq!(room.output.signals_for(&id("a")), vec![(id("b"), answer())]);
    assert_eq!(state(&room, "a", "b"), Some(ConnectionState::Negotiating));

    assert!(room.track("b", "a"));
    assert_eq!(state(&room, "b", "a"), Some(ConnectionState::Connected));
    assert_eq!(state(&room, "a", "b"), Some(ConnectionState::Negotiating));

    assert!(room.track("a", "b"));
    assert_eq!(state(&room, "a", "b"), Some(ConnectionState::Connected));
    assert!(!room.track("a", "b"), "second track report changes nothing");
}

#[tokio::test]
async fn test_signals_keep_per_pair_order() {
    let mut room = TestRoom::new(8);
    room.join("a").unwrap();
    room.join("b").unwrap();

    let sent: Vec<SignalPayload> = (0..5)
        .map(|i| SignalPayload::IceCandidate {
            candidate: format!("candidate:{i}"),
            sdp_mid: None,
            sdp_m_line_index: Some(i),
        })
        .collect();
    room.signal("a", "b", offer()).unwrap();
    for payload in &sent {
        room.signal("a", "b", payload.clone()).unwrap();
    }

    let received: Vec<SignalPayload> = room
        .output
        .signals_for(&id("b"))
        .into_iter()
        .map(|(_, payload)| payload)
        .collect();
    assert_eq!(received[0], offer());
    assert_eq!(&received[1..], sent.as_slice());
}

#[tokio::test]
async fn test_leave_while_negotiating_closes_peer_side() {
    let mut room = TestRoom::new(8);
    room.join("a").unwrap();
    room.join("b").unwrap();
    room.signal("a", "b", offer()).unwrap();
    assert_eq!(state(&room, "b", "a"), Some(ConnectionState::Negotiating));

    room.leave("a").unwrap();

    assert_eq!(state(&room, "b", "a"), Some(ConnectionState::Closed));
    assert_eq!(room.output.closed_peers_for(&id("b")), vec![id("a")]);
    assert_eq!(
        room.signal("a", "b", candidate()),
        Ok(SignalOutcome::Dropped)
    );
    assert_eq!(room.signal("b", "a", answer()), Ok(SignalOutcome::Dropped));
    assert_eq!(room.output.signals_for(&id("b")), vec![(id("a"), offer())]);

    room.join("c").unwrap();
    assert_eq!(state(&room, "b", "a"), None, "closed entry dropped once absent");
}

#[tokio::test]
async fn test_offer_after_failure_recreates_responder() {
    let mut room = TestRoom::new(8);
    room.join("a").unwrap();
    room.join("b").unwrap();
    assert!(room.coordinator.on_connection_failed(&id("b"), &id("a")));
    assert_eq!(state(&room, "b", "a"), Some(ConnectionState::Closed));

    assert_eq!(room.signal("a", "b", offer()), Ok(SignalOutcome::Delivered));

    let snapshot = room.coordinator.snapshot();
    let ba = snapshot.connection(&id("b"), &id("a")).unwrap();
    assert_eq!(ba.role, Role::Responder);
    assert_eq!(ba.state, ConnectionState::Negotiating);
    assert_eq!(room.output.signals_for(&id("b")), vec![(id("a"), offer())]);
}

#[tokio::test]
async fn test_answer_without_connection_is_invalid() {
    let mut room = TestRoom::new(8);
    room.join("a").unwrap();
    room.join("b").unwrap();
    room.coordinator.on_connection_failed(&id("a"), &id("b"));

    let err = room.signal("a", "b", answer()).unwrap_err();

    assert!(matches!(err, CoordinatorError::InvalidSignalTarget { .. }));
    assert_eq!(state(&room, "b", "a"), Some(ConnectionState::Closed));
    assert!(room.output.signals_for(&id("b")).is_empty());
}

#[tokio::test]
async fn test_self_and_malformed_signals_are_invalid() {
    let mut room = TestRoom::new(8);
    room.join("a").unwrap();
    room.join("b").unwrap();

    let self_addressed = room.signal("a", "a", offer()).unwrap_err();
    let empty = room
        .signal("a", "b", SignalPayload::Offer { sdp: String::new() })
        .unwrap_err();

    assert!(matches!(
        self_addressed,
        CoordinatorError::InvalidSignalTarget { reason: "self-addressed envelope", .. }
    ));
    assert!(matches!(empty, CoordinatorError::InvalidSignalTarget { .. }));
    assert_eq!(state(&room, "b", "a"), Some(ConnectionState::New));
}

#[tokio::test]
async fn test_transport_failure_retries_once_on_next_tick() {
    let mut room = TestRoom::new(8);
    room.join("a").unwrap();
    room.join("b").unwrap();

    assert!(room.coordinator.on_connection_failed(&id("a"), &id("b")));
    assert_eq!(state(&room, "a", "b"), Some(ConnectionState::Closed));
    assert_eq!(state(&room, "b", "a"), Some(ConnectionState::Closed));
    assert_eq!(room.output.closed_peers_for(&id("a")), vec![id("b")]);
    assert_eq!(room.output.closed_peers_for(&id("b")), vec![id("a")]);
    assert_eq!(room.coordinator.member_count(), 2);

    room.join("c").unwrap();
    assert_eq!(state(&room, "a", "b"), Some(ConnectionState::Negotiating));
    assert_eq!(room.output.offer_cues_for(&id("a")), ids(&["b", "b", "c"]));

    room.coordinator.on_connection_failed(&id("a"), &id("b"));
    room.join("d").unwrap();
    assert_eq!(state(&room, "a", "b"), Some(ConnectionState::Closed));
    assert_eq!(
        room.output.offer_cues_for(&id("a")),
        ids(&["b", "b", "c", "d"])
    );
}
