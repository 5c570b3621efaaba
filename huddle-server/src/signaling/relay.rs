use crate::errors::{CoordinatorError, TransportError};
use crate::mesh::{PeerMesh, SignalOutcome};
use crate::signaling::SignalingOutput;
use huddle_core::{ParticipantId, ServerMessage, SignalEnvelope};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Moves signaling payloads between participants of one room.
///
/// Outbound delivery is fire-and-forget: the output only enqueues onto the
/// target's ordered channel, so per (source, target) order is the order of
/// `send_local_signal` calls.
#[derive(Clone)]
pub struct SignalingRelay {
    output: Arc<dyn SignalingOutput>,
}

impl SignalingRelay {
    pub fn new(output: Arc<dyn SignalingOutput>) -> Self {
        Self { output }
    }

    /// Pushes `envelope.payload` to `envelope.target_id` as a `signal` frame.
    pub fn send_local_signal(&self, envelope: SignalEnvelope) -> Result<(), TransportError> {
        let SignalEnvelope {
            source_id,
            target_id,
            payload,
        } = envelope;
        self.output
            .send(&target_id, ServerMessage::Signal { source_id, payload })
    }

    /// Tells `owner_id` to start offering towards `peer_id`.
    pub fn cue_offer(
        &self,
        owner_id: &ParticipantId,
        peer_id: &ParticipantId,
    ) -> Result<(), TransportError> {
        self.output.send(
            owner_id,
            ServerMessage::BeginOffer {
                peer_id: peer_id.clone(),
            },
        )
    }

    /// Feeds an inbound envelope into the target's mesh, which creates a
    /// responder connection when none exists yet.
    pub fn receive_envelope(
        &self,
        meshes: &mut HashMap<ParticipantId, PeerMesh>,
        envelope: SignalEnvelope,
    ) -> Result<SignalOutcome, CoordinatorError> {
        let Some(mesh) = meshes.get_mut(&envelope.target_id) else {
            debug!(
                "Dropping {} from {}: {} is not in this room",
                envelope.payload.kind(),
                envelope.source_id,
                envelope.target_id
            );
            return Ok(SignalOutcome::Dropped);
        };
        mesh.receive(&envelope.source_id, envelope.payload)
    }
}
