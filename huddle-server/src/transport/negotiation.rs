use crate::errors::TransportError;
use crate::signaling::SignalingRelay;
use huddle_core::{ParticipantId, Role, SignalEnvelope, SignalPayload};
use tracing::debug;

/// The two ends of one connection, seen from `owner_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerLink {
    pub owner_id: ParticipantId,
    pub remote_id: ParticipantId,
}

/// One side of a peer-to-peer negotiation. Opaque to the coordinator;
/// completion of async work re-enters the coordinator as room commands.
pub trait NegotiationSession: Send {
    /// Start producing an offer towards the remote side.
    fn begin_offer(&mut self) -> Result<(), TransportError>;

    /// Feed a payload that arrived from the remote side.
    fn apply_remote(&mut self, payload: SignalPayload) -> Result<(), TransportError>;

    /// Abandon the negotiation. In-flight messages are discarded.
    fn close(&mut self);
}

pub trait NegotiationBackend: Send + Sync {
    fn open(&self, link: &PeerLink, role: Role) -> Box<dyn NegotiationSession>;
}

/// Negotiation carried out by the owning client itself. The session only
/// forwards cues and remote payloads to that client through the relay.
pub struct ClientNegotiation {
    relay: SignalingRelay,
}

impl ClientNegotiation {
    pub fn new(relay: SignalingRelay) -> Self {
        Self { relay }
    }
}

impl NegotiationBackend for ClientNegotiation {
    fn open(&self, link: &PeerLink, role: Role) -> Box<dyn NegotiationSession> {
        debug!(
            "Opening {:?} session {} -> {}",
            role, link.owner_id, link.remote_id
        );
        Box::new(ClientSession {
            link: link.clone(),
            relay: self.relay.clone(),
            closed: false,
        })
    }
}

struct ClientSession {
    link: PeerLink,
    relay: SignalingRelay,
    closed: bool,
}

impl NegotiationSession for ClientSession {
    fn begin_offer(&mut self) -> Result<(), TransportError> {
        self.relay
            .cue_offer(&self.link.owner_id, &self.link.remote_id)
    }

    fn apply_remote(&mut self, payload: SignalPayload) -> Result<(), TransportError> {
        if self.closed {
            debug!(
                "Discarding {} for closed session {} -> {}",
                payload.kind(),
                self.link.owner_id,
                self.link.remote_id
            );
            return Ok(());
        }
        self.relay.send_local_signal(SignalEnvelope::new(
            self.link.remote_id.clone(),
            self.link.owner_id.clone(),
            payload,
        ))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
