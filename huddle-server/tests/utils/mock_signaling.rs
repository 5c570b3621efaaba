use huddle_core::{
    ConstraintKind, ErrorCode, ParticipantId, ServerMessage, SignalPayload,
};
use huddle_server::{SignalingOutput, TransportError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub type Sent = (ParticipantId, ServerMessage);

/// Mock SignalingOutput that captures every outgoing message.
#[derive(Clone)]
pub struct MockSignalingOutput {
    /// Channel to send captured messages.
    tx: mpsc::UnboundedSender<Sent>,
    /// All captured messages (for verification).
    sent: Arc<Mutex<Vec<Sent>>>,
    /// Participants whose channel is closed.
    disconnected: Arc<Mutex<HashSet<ParticipantId>>>,
}

impl MockSignalingOutput {
    /// Create a new MockSignalingOutput and its receiver channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Sent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let output = Self {
            tx,
            sent: Arc::new(Mutex::new(Vec::new())),
            disconnected: Arc::new(Mutex::new(HashSet::new())),
        };
        (output, rx)
    }

    /// Create a MockSignalingOutput without a receiver (messages are only stored).
    pub fn new_stored_only() -> Self {
        let (output, _rx) = Self::new();
        output
    }

    /// Further sends to `participant_id` fail with `Disconnected`.
    pub fn disconnect(&self, participant_id: &ParticipantId) {
        self.disconnected
            .lock()
            .unwrap()
            .insert(participant_id.clone());
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn all(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn messages_for(&self, participant_id: &ParticipantId) -> Vec<ServerMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == participant_id)
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    /// Every roster `participant_id` received, as id lists.
    pub fn rosters_for(&self, participant_id: &ParticipantId) -> Vec<Vec<ParticipantId>> {
        self.messages_for(participant_id)
            .into_iter()
            .filter_map(|msg| match msg {
                ServerMessage::RosterUpdated(roster) => {
                    Some(roster.into_iter().map(|e| e.id).collect())
                }
                _ => None,
            })
            .collect()
    }

    pub fn last_roster_for(&self, participant_id: &ParticipantId) -> Option<Vec<ParticipantId>> {
        self.rosters_for(participant_id).pop()
    }

    pub fn signals_for(&self, participant_id: &ParticipantId) -> Vec<(ParticipantId, SignalPayload)> {
        self.messages_for(participant_id)
            .into_iter()
            .filter_map(|msg| match msg {
                ServerMessage::Signal { source_id, payload } => Some((source_id, payload)),
                _ => None,
            })
            .collect()
    }

    pub fn offer_cues_for(&self, participant_id: &ParticipantId) -> Vec<ParticipantId> {
        self.messages_for(participant_id)
            .into_iter()
            .filter_map(|msg| match msg {
                ServerMessage::BeginOffer { peer_id } => Some(peer_id),
                _ => None,
            })
            .collect()
    }

    pub fn closed_peers_for(&self, participant_id: &ParticipantId) -> Vec<ParticipantId> {
        self.messages_for(participant_id)
            .into_iter()
            .filter_map(|msg| match msg {
                ServerMessage::PeerClosed { peer_id } => Some(peer_id),
                _ => None,
            })
            .collect()
    }

    pub fn errors_for(&self, participant_id: &ParticipantId) -> Vec<ErrorCode> {
        self.messages_for(participant_id)
            .into_iter()
            .filter_map(|msg| match msg {
                ServerMessage::Error { code, .. } => Some(code),
                _ => None,
            })
            .collect()
    }

    pub fn lifted_for(&self, participant_id: &ParticipantId) -> Vec<ConstraintKind> {
        self.messages_for(participant_id)
            .into_iter()
            .filter_map(|msg| match msg {
                ServerMessage::ConstraintLifted { kind } => Some(kind),
                _ => None,
            })
            .collect()
    }

    /// Recipients of any `constraintApplied` notice.
    pub fn constraint_recipients(&self) -> Vec<ParticipantId> {
        self.all()
            .into_iter()
            .filter(|(_, msg)| matches!(msg, ServerMessage::ConstraintApplied { .. }))
            .map(|(id, _)| id)
            .collect()
    }
}

impl Default for MockSignalingOutput {
    fn default() -> Self {
        Self::new_stored_only()
    }
}

impl SignalingOutput for MockSignalingOutput {
    fn send(
        &self,
        participant_id: &ParticipantId,
        message: ServerMessage,
    ) -> Result<(), TransportError> {
        if self.disconnected.lock().unwrap().contains(participant_id) {
            return Err(TransportError::Disconnected(participant_id.clone()));
        }
        tracing::debug!("[MockSignaling] {:?} to {}", message, participant_id);

        let sent = (participant_id.clone(), message);
        self.sent.lock().unwrap().push(sent.clone());
        let _ = self.tx.send(sent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_signaling_captures_messages() {
        let (output, mut rx) = MockSignalingOutput::new();
        let id = ParticipantId::from("a");

        output
            .send(&id, ServerMessage::BeginOffer { peer_id: "b".into() })
            .unwrap();

        let (to, msg) = rx.try_recv().unwrap();
        assert_eq!(to, id);
        assert!(matches!(msg, ServerMessage::BeginOffer { .. }));
        assert_eq!(output.offer_cues_for(&id), vec![ParticipantId::from("b")]);
    }

    #[test]
    fn test_mock_signaling_disconnect() {
        let output = MockSignalingOutput::new_stored_only();
        let id = ParticipantId::from("a");
        output.disconnect(&id);

        let res = output.send(&id, ServerMessage::RosterUpdated(Vec::new()));

        assert_eq!(res, Err(TransportError::Disconnected(id.clone())));
        assert!(output.messages_for(&id).is_empty());
    }
}
