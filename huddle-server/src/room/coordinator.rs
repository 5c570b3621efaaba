use crate::config::CoordinatorConfig;
use crate::control::{Constraint, ConstraintApplier, MAX_CONSTRAINT_DURATION};
use crate::errors::{CoordinatorError, TransportError};
use crate::mesh::{ConnectionState, MeshDeps, MeshSettings, PeerMesh, SignalOutcome};
use crate::room::registry::{Directory, MembershipRegistry};
use crate::room::room_event::RoomEvent;
use crate::room::timers::TimerScheduler;
use crate::signaling::{self, SignalingOutput, SignalingRelay};
use crate::transport::{NegotiationBackend, RenderSurface};
use huddle_core::{
    ControlCommand, MediaProfile, MediaStream, ParticipantId, Role, RoomId, RosterEntry,
    ServerMessage, SignalEnvelope,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomSettings {
    pub capacity: usize,
    pub mesh: MeshSettings,
}

impl From<&CoordinatorConfig> for RoomSettings {
    fn from(config: &CoordinatorConfig) -> Self {
        Self {
            capacity: config.room_capacity,
            mesh: MeshSettings {
                negotiation_timeout: config.negotiation_timeout,
                max_connection_attempts: config.max_connection_attempts,
            },
        }
    }
}

/// Collaborators a room is built with. Shared by every room of a process.
#[derive(Clone)]
pub struct RoomServices {
    pub output: Arc<dyn SignalingOutput>,
    pub backend: Arc<dyn NegotiationBackend>,
    pub surface: Arc<dyn RenderSurface>,
    pub directory: Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub roster: Vec<RosterEntry>,
    pub room_empty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub owner_id: ParticipantId,
    pub remote_id: ParticipantId,
    pub role: Role,
    pub state: ConnectionState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub roster: Vec<RosterEntry>,
    /// Sorted by (owner, remote).
    pub connections: Vec<ConnectionSnapshot>,
    pub constraints: Vec<Constraint>,
}

impl RoomSnapshot {
    pub fn connection(
        &self,
        owner_id: &ParticipantId,
        remote_id: &ParticipantId,
    ) -> Option<&ConnectionSnapshot> {
        self.connections
            .iter()
            .find(|c| &c.owner_id == owner_id && &c.remote_id == remote_id)
    }
}

/// All state of one room and the synchronous entry points that mutate it.
///
/// Every entry point runs to completion: registry mutation first, then
/// reconciliation of every member's mesh, then the outbound notices. The
/// owning room actor guarantees entry points never overlap.
pub struct Coordinator {
    registry: MembershipRegistry,
    meshes: HashMap<ParticipantId, PeerMesh>,
    constraints: ConstraintApplier,
    relay: SignalingRelay,
    output: Arc<dyn SignalingOutput>,
    mesh_deps: MeshDeps,
    capacity: usize,
}

impl Coordinator {
    pub fn new(
        room_id: RoomId,
        services: RoomServices,
        timers: TimerScheduler,
        settings: RoomSettings,
    ) -> Self {
        let RoomServices {
            output,
            backend,
            surface,
            directory,
        } = services;

        Self {
            registry: MembershipRegistry::new(room_id, directory),
            meshes: HashMap::new(),
            constraints: ConstraintApplier::new(timers.clone(), output.clone()),
            relay: SignalingRelay::new(output.clone()),
            output,
            mesh_deps: MeshDeps {
                backend,
                surface,
                timers,
                settings: settings.mesh,
            },
            capacity: settings.capacity,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        self.registry.room_id()
    }

    pub fn member_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn mesh(&self, participant_id: &ParticipantId) -> Option<&PeerMesh> {
        self.meshes.get(participant_id)
    }

    pub fn on_join_request(
        &mut self,
        participant_id: ParticipantId,
        display_name: String,
        media: MediaProfile,
    ) -> Result<Vec<RosterEntry>, CoordinatorError> {
        if self.registry.contains(&participant_id) {
            return Err(CoordinatorError::DuplicateJoin(participant_id));
        }
        if self.registry.len() >= self.capacity {
            return Err(CoordinatorError::RoomFull(self.room_id().clone()));
        }

        let roster = self.registry.join(participant_id.clone(), display_name)?;
        info!(
            "{} joined room {} ({} members)",
            participant_id,
            self.room_id(),
            roster.len()
        );

        let stream = MediaStream::new(format!("stream-{participant_id}"), media);
        self.meshes.insert(
            participant_id.clone(),
            PeerMesh::new(participant_id.clone(), stream, self.mesh_deps.clone()),
        );
        self.reconcile_all();

        self.notify(
            &participant_id,
            ServerMessage::RoomAssigned {
                room_id: self.room_id().clone(),
            },
        );
        self.broadcast_roster(&roster);
        Ok(roster)
    }

    /// Explicit leave and socket close take the same path.
    pub fn on_leave_or_disconnect(
        &mut self,
        participant_id: &ParticipantId,
    ) -> Result<LeaveOutcome, CoordinatorError> {
        let roster = self.registry.leave(participant_id)?;
        info!(
            "{} left room {} ({} members)",
            participant_id,
            self.room_id(),
            roster.len()
        );

        self.constraints.cancel_for(participant_id);
        if let Some(mut mesh) = self.meshes.remove(participant_id) {
            mesh.shutdown();
        }
        self.reconcile_all();
        self.broadcast_roster(&roster);

        Ok(LeaveOutcome {
            roster,
            room_empty: self.registry.is_empty(),
        })
    }

    pub fn on_signal_received(
        &mut self,
        envelope: SignalEnvelope,
    ) -> Result<SignalOutcome, CoordinatorError> {
        if !self.registry.contains(&envelope.source_id) {
            debug!(
                "Dropping {} from non-member {}",
                envelope.payload.kind(),
                envelope.source_id
            );
            return Ok(SignalOutcome::Dropped);
        }
        self.relay.receive_envelope(&mut self.meshes, envelope)
    }

    /// `owner_id`'s client got the first media track from `source_id`.
    pub fn on_track_received(&mut self, owner_id: &ParticipantId, source_id: &ParticipantId) -> bool {
        let Some(stream) = self.meshes.get(source_id).map(|m| m.local_stream().clone()) else {
            debug!("Track from non-member {} ignored", source_id);
            return false;
        };
        let Some(mesh) = self.meshes.get_mut(owner_id) else {
            return false;
        };
        mesh.track_received(source_id, stream)
    }

    /// A client reported its transport towards `remote_id` dead. Both
    /// halves of the pair close; the next membership change may retry.
    pub fn on_connection_failed(
        &mut self,
        owner_id: &ParticipantId,
        remote_id: &ParticipantId,
    ) -> bool {
        let Some(mesh) = self.meshes.get_mut(owner_id) else {
            return false;
        };
        let closed = mesh.transport_failed(remote_id);
        if let Some(remote_mesh) = self.meshes.get_mut(remote_id) {
            remote_mesh.transport_failed(owner_id);
        }
        closed
    }

    pub fn on_control_command(
        &mut self,
        issuer_id: &ParticipantId,
        command: ControlCommand,
    ) -> Result<(), CoordinatorError> {
        let duration = Duration::from_secs(command.duration_seconds());
        if duration > MAX_CONSTRAINT_DURATION {
            return Err(CoordinatorError::InvalidCommand(format!(
                "duration of {}s exceeds the {}s limit",
                duration.as_secs(),
                MAX_CONSTRAINT_DURATION.as_secs()
            )));
        }

        match command {
            ControlCommand::Mute { target_id, .. } => {
                let Some(mesh) = self.meshes.get(&target_id) else {
                    return Err(CoordinatorError::NotFound(target_id));
                };
                let stream = mesh.local_stream().clone();
                info!("{} mutes {}", issuer_id, target_id);
                self.constraints.mute(&target_id, &stream, duration);
            }
            ControlCommand::PrivatePair {
                first_id,
                second_id,
                ..
            } => {
                if first_id == second_id {
                    return Err(CoordinatorError::InvalidCommand(format!(
                        "{first_id} cannot be paired with itself"
                    )));
                }
                for id in [&first_id, &second_id] {
                    if !self.registry.contains(id) {
                        return Err(CoordinatorError::NotFound(id.clone()));
                    }
                }
                info!("{} pairs {} with {}", issuer_id, first_id, second_id);
                self.constraints.private_pair(&first_id, &second_id, duration);
            }
        }
        Ok(())
    }

    pub fn on_room_event(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::ConstraintExpired {
                target_id,
                kind,
                generation,
            } => {
                self.constraints.expire(&target_id, kind, generation);
            }

            RoomEvent::NegotiationDeadline {
                owner_id,
                remote_id,
                generation,
            } => {
                let Some(mesh) = self.meshes.get_mut(&owner_id) else {
                    debug!("Deadline for departed {} ignored", owner_id);
                    return;
                };
                if mesh.deadline_reached(&remote_id, generation) {
                    let err = CoordinatorError::NegotiationTimeout {
                        owner_id: owner_id.clone(),
                        remote_id,
                    };
                    self.report_error(&owner_id, &err);
                }
            }
        }
    }

    /// Sends `err` back to the participant whose request caused it.
    pub fn report_error(&self, participant_id: &ParticipantId, err: &CoordinatorError) {
        signaling::report_error(self.output.as_ref(), participant_id, err);
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        let mut connections: Vec<ConnectionSnapshot> = self
            .meshes
            .values()
            .flat_map(|mesh| {
                mesh.connections().map(|conn| ConnectionSnapshot {
                    owner_id: mesh.local_id().clone(),
                    remote_id: conn.remote_id().clone(),
                    role: conn.role(),
                    state: conn.state(),
                })
            })
            .collect();
        connections.sort_by(|a, b| {
            (&a.owner_id, &a.remote_id).cmp(&(&b.owner_id, &b.remote_id))
        });

        let mut constraints = self.constraints.active();
        constraints.sort_by(|a, b| (&a.target_id, a.kind).cmp(&(&b.target_id, b.kind)));

        RoomSnapshot {
            room_id: self.room_id().clone(),
            roster: self.registry.roster(),
            connections,
            constraints,
        }
    }

    /// Tears down every connection and timer and forgets all members.
    pub fn shutdown(&mut self) {
        for mesh in self.meshes.values_mut() {
            mesh.shutdown();
        }
        self.meshes.clear();
        self.constraints.clear();
        self.registry.clear();
        info!("Room {} shut down", self.room_id());
    }

    /// Reconciles in join order so the order of negotiation cues is stable.
    fn reconcile_all(&mut self) {
        let members = self.registry.member_ids();
        for id in &members {
            if let Some(mesh) = self.meshes.get_mut(id) {
                mesh.reconcile(&members);
            }
        }
    }

    fn broadcast_roster(&self, roster: &[RosterEntry]) {
        for entry in roster {
            self.notify(&entry.id, ServerMessage::RosterUpdated(roster.to_vec()));
        }
    }

    fn notify(&self, participant_id: &ParticipantId, message: ServerMessage) {
        match self.output.send(participant_id, message) {
            Ok(()) => {}
            Err(TransportError::Disconnected(_)) => {
                debug!("{} has no open channel", participant_id)
            }
            Err(e) => warn!("{}", e),
        }
    }
}
