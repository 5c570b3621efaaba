use crate::errors::CoordinatorError;
use crate::mesh::peer_connection::{CloseReason, ConnectionState, PeerConnection};
use crate::room::{RoomEvent, TimerScheduler};
use crate::transport::{NegotiationBackend, PeerLink, RenderSurface};
use huddle_core::{ParticipantId, Role, SignalPayload, StreamHandle, local_role};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshSettings {
    pub negotiation_timeout: Duration,
    pub max_connection_attempts: u32,
}

/// Collaborators shared by every mesh of a room.
#[derive(Clone)]
pub struct MeshDeps {
    pub backend: Arc<dyn NegotiationBackend>,
    pub surface: Arc<dyn RenderSurface>,
    pub timers: TimerScheduler,
    pub settings: MeshSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Delivered,
    /// Source or target is not (or no longer) a member.
    Dropped,
}

/// Connection lifecycle of one local participant towards every other
/// member of its room.
///
/// Keeps at most one live connection per remote. A closed connection stays
/// visible until it is replaced or its remote is absent from a later
/// roster.
pub struct PeerMesh {
    local_id: ParticipantId,
    local_stream: StreamHandle,
    roster: Vec<ParticipantId>,
    connections: HashMap<ParticipantId, PeerConnection>,
    attempts: HashMap<ParticipantId, u32>,
    next_generation: u64,
    deps: MeshDeps,
}

impl PeerMesh {
    pub fn new(local_id: ParticipantId, local_stream: StreamHandle, deps: MeshDeps) -> Self {
        Self {
            local_id,
            local_stream,
            roster: Vec::new(),
            connections: HashMap::new(),
            attempts: HashMap::new(),
            next_generation: 1,
            deps,
        }
    }

    pub fn local_id(&self) -> &ParticipantId {
        &self.local_id
    }

    pub fn local_stream(&self) -> &StreamHandle {
        &self.local_stream
    }

    /// Last roster seen, excluding the local participant.
    pub fn roster(&self) -> &[ParticipantId] {
        &self.roster
    }

    pub fn connection(&self, remote_id: &ParticipantId) -> Option<&PeerConnection> {
        self.connections.get(remote_id)
    }

    pub fn connections(&self) -> impl Iterator<Item = &PeerConnection> {
        self.connections.values()
    }

    pub fn live_connections(&self) -> usize {
        self.connections.values().filter(|c| c.is_live()).count()
    }

    /// Brings connections in line with `roster`: closes those whose remote
    /// is gone, opens one towards each present remote that has none.
    pub fn reconcile(&mut self, roster: &[ParticipantId]) {
        let local_id = self.local_id.clone();
        let present: HashSet<&ParticipantId> =
            roster.iter().filter(|id| **id != local_id).collect();

        self.connections
            .retain(|id, conn| conn.is_live() || present.contains(id));

        let departed: Vec<ParticipantId> = self
            .connections
            .iter()
            .filter(|(id, conn)| conn.is_live() && !present.contains(id))
            .map(|(id, _)| id.clone())
            .collect();
        for remote_id in departed {
            self.close(&remote_id, CloseReason::Departed);
        }
        self.attempts.retain(|id, _| present.contains(id));

        for remote_id in roster.iter().filter(|id| **id != local_id) {
            if self.connections.get(remote_id).is_some_and(|c| c.is_live()) {
                continue;
            }

            let attempts = self.attempts.get(remote_id).copied().unwrap_or(0);
            if attempts >= self.deps.settings.max_connection_attempts {
                debug!(
                    "{} not reconnecting to {} after {} attempts",
                    self.local_id, remote_id, attempts
                );
                continue;
            }

            let role = local_role(&local_id, remote_id);
            self.open(remote_id.clone(), role);
        }

        self.roster = roster
            .iter()
            .filter(|id| **id != local_id)
            .cloned()
            .collect();
    }

    /// Feeds a payload from `source_id` into its connection, creating a
    /// responder connection on demand when none is live.
    pub fn receive(
        &mut self,
        source_id: &ParticipantId,
        payload: SignalPayload,
    ) -> Result<SignalOutcome, CoordinatorError> {
        let target_id = self.local_id.clone();
        let kind = payload.kind();
        let invalid = move |reason: &'static str| CoordinatorError::InvalidSignalTarget {
            source_id: source_id.clone(),
            target_id: target_id.clone(),
            payload: kind,
            reason,
        };

        if *source_id == self.local_id {
            return Err(invalid("self-addressed envelope"));
        }
        if !payload.is_well_formed() {
            return Err(invalid("malformed payload"));
        }

        let live = self
            .connections
            .get(source_id)
            .is_some_and(|c| c.is_live());
        if !live {
            if !payload.can_open_negotiation() {
                return Err(invalid("no negotiation in progress"));
            }
            debug!(
                "{} got {} from {} before any connection, creating responder",
                self.local_id,
                payload.kind(),
                source_id
            );
            self.open(source_id.clone(), Role::Responder);
        }

        let Some(conn) = self.connections.get_mut(source_id) else {
            return Err(invalid("connection unavailable"));
        };
        if matches!(payload, SignalPayload::Offer { .. }) && conn.role() == Role::Initiator {
            warn!(
                "{} received an offer from {} while being the initiator",
                self.local_id, source_id
            );
        }
        if let Err(e) = conn.apply_remote(payload) {
            self.close(source_id, CloseReason::TransportFailure);
            return Err(e.into());
        }

        Ok(SignalOutcome::Delivered)
    }

    /// First inbound media track from `remote_id`.
    pub fn track_received(&mut self, remote_id: &ParticipantId, stream: StreamHandle) -> bool {
        let Some(conn) = self.connections.get_mut(remote_id) else {
            return false;
        };
        if !conn.mark_connected(stream.clone()) {
            return false;
        }

        info!("{} connected to {}", self.local_id, remote_id);
        self.attempts.remove(remote_id);
        self.deps.surface.attach(&self.local_id, remote_id, &stream);
        true
    }

    pub fn transport_failed(&mut self, remote_id: &ParticipantId) -> bool {
        self.close(remote_id, CloseReason::TransportFailure)
    }

    /// Negotiation deadline fired. Ignored unless it belongs to the current
    /// connection and that connection has not connected yet.
    pub fn deadline_reached(&mut self, remote_id: &ParticipantId, generation: u64) -> bool {
        let pending = self.connections.get(remote_id).is_some_and(|c| {
            c.generation() == generation
                && matches!(
                    c.state(),
                    ConnectionState::New | ConnectionState::Negotiating
                )
        });
        if !pending {
            debug!(
                "Stale negotiation deadline {} -> {} (generation {})",
                self.local_id, remote_id, generation
            );
            return false;
        }

        warn!(
            "{}",
            CoordinatorError::NegotiationTimeout {
                owner_id: self.local_id.clone(),
                remote_id: remote_id.clone(),
            }
        );
        self.close(remote_id, CloseReason::NegotiationTimeout)
    }

    /// Closes everything; the mesh is unusable afterwards.
    pub fn shutdown(&mut self) {
        let live: Vec<ParticipantId> = self
            .connections
            .iter()
            .filter(|(_, c)| c.is_live())
            .map(|(id, _)| id.clone())
            .collect();
        for remote_id in live {
            self.close(&remote_id, CloseReason::Teardown);
        }
        self.roster.clear();
        self.attempts.clear();
    }

    fn open(&mut self, remote_id: ParticipantId, role: Role) {
        let generation = self.next_generation;
        self.next_generation += 1;
        *self.attempts.entry(remote_id.clone()).or_default() += 1;

        let link = PeerLink {
            owner_id: self.local_id.clone(),
            remote_id: remote_id.clone(),
        };
        let session = self.deps.backend.open(&link, role);
        let mut conn = PeerConnection::new(
            remote_id.clone(),
            role,
            generation,
            self.local_stream.clone(),
            session,
        );
        conn.arm_deadline(self.deps.timers.schedule(
            self.deps.settings.negotiation_timeout,
            RoomEvent::NegotiationDeadline {
                owner_id: self.local_id.clone(),
                remote_id: remote_id.clone(),
                generation,
            },
        ));

        info!(
            "{} opened connection to {} as {:?}",
            self.local_id, remote_id, role
        );

        let failed = role == Role::Initiator && conn.begin().is_err();
        self.connections.insert(remote_id.clone(), conn);
        if failed {
            self.close(&remote_id, CloseReason::TransportFailure);
        }
    }

    fn close(&mut self, remote_id: &ParticipantId, reason: CloseReason) -> bool {
        let Some(conn) = self.connections.get_mut(remote_id) else {
            return false;
        };
        if !conn.close(reason) {
            return false;
        }

        if reason.is_failure() {
            warn!(
                "{} closed connection to {}: {:?}",
                self.local_id, remote_id, reason
            );
        } else {
            info!(
                "{} closed connection to {}: {:?}",
                self.local_id, remote_id, reason
            );
        }
        self.deps.surface.detach(&self.local_id, remote_id);
        true
    }
}
