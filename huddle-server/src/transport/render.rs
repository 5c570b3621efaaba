use crate::errors::TransportError;
use crate::signaling::SignalingOutput;
use huddle_core::{ParticipantId, ServerMessage, StreamHandle};
use std::sync::Arc;
use tracing::{debug, warn};

/// Where remote streams are displayed for a participant.
pub trait RenderSurface: Send + Sync {
    fn attach(&self, owner_id: &ParticipantId, remote_id: &ParticipantId, stream: &StreamHandle);

    fn detach(&self, owner_id: &ParticipantId, remote_id: &ParticipantId);
}

/// Tiles live in the client UI; removals are pushed as `peerClosed`.
pub struct ClientRenderSurface {
    output: Arc<dyn SignalingOutput>,
}

impl ClientRenderSurface {
    pub fn new(output: Arc<dyn SignalingOutput>) -> Self {
        Self { output }
    }
}

impl RenderSurface for ClientRenderSurface {
    fn attach(&self, owner_id: &ParticipantId, remote_id: &ParticipantId, stream: &StreamHandle) {
        debug!(
            "{} renders stream {} from {}",
            owner_id,
            stream.id(),
            remote_id
        );
    }

    fn detach(&self, owner_id: &ParticipantId, remote_id: &ParticipantId) {
        let msg = ServerMessage::PeerClosed {
            peer_id: remote_id.clone(),
        };
        match self.output.send(owner_id, msg) {
            Ok(()) => {}
            // Owner is leaving too.
            Err(TransportError::Disconnected(_)) => {
                debug!("{} gone before peerClosed for {}", owner_id, remote_id)
            }
            Err(e) => warn!("Failed to notify {} about closed peer: {}", owner_id, e),
        }
    }
}
