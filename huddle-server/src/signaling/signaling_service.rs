use crate::errors::TransportError;
use crate::signaling::SignalingOutput;
use axum::extract::ws::Message;
use dashmap::DashMap;
use huddle_core::{IceServerConfig, ParticipantId, ServerMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::error;

struct SignalingInner {
    peers: DashMap<ParticipantId, mpsc::UnboundedSender<Message>>,
    ice_servers: Vec<IceServerConfig>,
}

/// WebSocket side of the transport channel: one outbound queue per
/// connected participant.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
}

impl SignalingService {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                peers: DashMap::new(),
                ice_servers,
            }),
        }
    }

    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    pub fn add_peer(&self, participant_id: ParticipantId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.peers.insert(participant_id, tx);
    }

    pub fn remove_peer(&self, participant_id: &ParticipantId) {
        self.inner.peers.remove(participant_id);
    }

    pub fn is_connected(&self, participant_id: &ParticipantId) -> bool {
        self.inner.peers.contains_key(participant_id)
    }
}

impl SignalingOutput for SignalingService {
    fn send(
        &self,
        participant_id: &ParticipantId,
        message: ServerMessage,
    ) -> Result<(), TransportError> {
        let Some(peer) = self.inner.peers.get(participant_id) else {
            return Err(TransportError::Disconnected(participant_id.clone()));
        };

        let json = serde_json::to_string(&message).map_err(|e| {
            error!("Failed to serialize server message: {}", e);
            TransportError::Encode(participant_id.clone(), e.to_string())
        })?;

        peer.send(Message::Text(json.into()))
            .map_err(|_| TransportError::Disconnected(participant_id.clone()))
    }
}
