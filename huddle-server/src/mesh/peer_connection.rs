use crate::errors::TransportError;
use crate::room::TimerGuard;
use crate::transport::NegotiationSession;
use huddle_core::{ParticipantId, Role, SignalPayload, StreamHandle};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    New,
    Negotiating,
    Connected,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Explicit teardown (owner left, room shut down).
    Teardown,
    /// Remote no longer in the roster.
    Departed,
    NegotiationTimeout,
    TransportFailure,
}

impl CloseReason {
    /// Whether the remote may get another connection on the next reconcile.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::NegotiationTimeout | Self::TransportFailure)
    }
}

/// Local side of one pairwise connection.
pub struct PeerConnection {
    remote_id: ParticipantId,
    role: Role,
    state: ConnectionState,
    generation: u64,
    local_stream: Option<StreamHandle>,
    remote_stream: Option<StreamHandle>,
    session: Box<dyn NegotiationSession>,
    deadline: Option<TimerGuard>,
    close_reason: Option<CloseReason>,
}

impl PeerConnection {
    pub(crate) fn new(
        remote_id: ParticipantId,
        role: Role,
        generation: u64,
        local_stream: StreamHandle,
        session: Box<dyn NegotiationSession>,
    ) -> Self {
        Self {
            remote_id,
            role,
            state: ConnectionState::New,
            generation,
            local_stream: Some(local_stream),
            remote_stream: None,
            session,
            deadline: None,
            close_reason: None,
        }
    }

    pub fn remote_id(&self) -> &ParticipantId {
        &self.remote_id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn local_stream(&self) -> Option<&StreamHandle> {
        self.local_stream.as_ref()
    }

    pub fn remote_stream(&self) -> Option<&StreamHandle> {
        self.remote_stream.as_ref()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    pub fn is_live(&self) -> bool {
        self.state != ConnectionState::Closed
    }

    pub(crate) fn arm_deadline(&mut self, guard: TimerGuard) {
        self.deadline = Some(guard);
    }

    /// Initiator side: move to `Negotiating` and ask for an offer.
    pub(crate) fn begin(&mut self) -> Result<(), TransportError> {
        if self.state != ConnectionState::New {
            return Ok(());
        }
        self.state = ConnectionState::Negotiating;
        if self.role == Role::Initiator {
            self.session.begin_offer()?;
        }
        Ok(())
    }

    pub(crate) fn apply_remote(&mut self, payload: SignalPayload) -> Result<(), TransportError> {
        match self.state {
            ConnectionState::Closed => {
                debug!(
                    "Dropping {} from {}: connection closed",
                    payload.kind(),
                    self.remote_id
                );
                Ok(())
            }
            ConnectionState::New => {
                self.state = ConnectionState::Negotiating;
                self.session.apply_remote(payload)
            }
            ConnectionState::Negotiating | ConnectionState::Connected => {
                self.session.apply_remote(payload)
            }
        }
    }

    /// First inbound media track. Returns `false` if the state does not
    /// allow the transition.
    pub(crate) fn mark_connected(&mut self, remote_stream: StreamHandle) -> bool {
        match self.state {
            ConnectionState::New | ConnectionState::Negotiating => {
                self.state = ConnectionState::Connected;
                self.remote_stream = Some(remote_stream);
                self.deadline = None;
                true
            }
            ConnectionState::Connected | ConnectionState::Closed => false,
        }
    }

    /// Moves to `Closed` from any state, releasing streams, the session and
    /// the negotiation deadline. Idempotent.
    pub(crate) fn close(&mut self, reason: CloseReason) -> bool {
        if self.state == ConnectionState::Closed {
            return false;
        }
        self.state = ConnectionState::Closed;
        self.close_reason = Some(reason);
        self.deadline = None;
        self.local_stream = None;
        self.remote_stream = None;
        self.session.close();
        true
    }
}

impl std::fmt::Debug for PeerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerConnection")
            .field("remote_id", &self.remote_id)
            .field("role", &self.role)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
