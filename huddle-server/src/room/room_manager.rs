use crate::config::CoordinatorConfig;
use crate::errors::CoordinatorError;
use crate::room::assignment::{FillFirstAssigner, RoomAssigner, RoomLoad};
use crate::room::coordinator::{LeaveOutcome, RoomServices, RoomSettings, RoomSnapshot};
use crate::room::registry::Directory;
use crate::room::room::Room;
use crate::room::room_command::RoomCommand;
use crate::signaling::{SignalingOutput, SignalingRelay};
use crate::transport::{ClientNegotiation, ClientRenderSurface};
use dashmap::DashMap;
use huddle_core::{
    ControlCommand, MediaProfile, ParticipantId, RoomId, RosterEntry, SignalEnvelope,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Rooms tried by one join before giving up.
const JOIN_ATTEMPTS: usize = 3;

struct RoomEntry {
    sender: mpsc::Sender<RoomCommand>,
    occupancy: Arc<AtomicUsize>,
    opened: u64,
    task: JoinHandle<()>,
}

struct ManagerInner {
    rooms: DashMap<RoomId, RoomEntry>,
    services: RoomServices,
    settings: RoomSettings,
    command_buffer: usize,
    assigner: Box<dyn RoomAssigner>,
    next_opened: AtomicU64,
}

/// Owns every room actor of the process and routes participants to them.
#[derive(Clone)]
pub struct RoomManager {
    inner: Arc<ManagerInner>,
}

impl RoomManager {
    /// Rooms negotiate through the clients themselves and report tile
    /// removal over `output`.
    pub fn new(config: &CoordinatorConfig, output: Arc<dyn SignalingOutput>) -> Self {
        let services = RoomServices {
            backend: Arc::new(ClientNegotiation::new(SignalingRelay::new(output.clone()))),
            surface: Arc::new(ClientRenderSurface::new(output.clone())),
            output,
            directory: Directory::default(),
        };
        Self::from_parts(
            services,
            RoomSettings::from(config),
            config.room_command_buffer,
            Box::new(FillFirstAssigner),
        )
    }

    pub fn from_parts(
        services: RoomServices,
        settings: RoomSettings,
        command_buffer: usize,
        assigner: Box<dyn RoomAssigner>,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                rooms: DashMap::new(),
                services,
                settings,
                command_buffer,
                assigner,
                next_opened: AtomicU64::new(1),
            }),
        }
    }

    pub fn room_of(&self, participant_id: &ParticipantId) -> Option<RoomId> {
        self.inner
            .services
            .directory
            .get(participant_id)
            .map(|r| r.value().clone())
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }

    /// Joins `requested`, or the room picked by the assigner. A join that
    /// loses a race against a closing room, or against the last free seat
    /// of an assigned room, moves on to another room.
    pub async fn join(
        &self,
        participant_id: ParticipantId,
        display_name: String,
        requested: Option<RoomId>,
        media: MediaProfile,
    ) -> Result<(RoomId, Vec<RosterEntry>), CoordinatorError> {
        if self.room_of(&participant_id).is_some() {
            return Err(CoordinatorError::DuplicateJoin(participant_id));
        }

        let mut last_err = None;
        for _ in 0..JOIN_ATTEMPTS {
            let room_id = match &requested {
                Some(room_id) => room_id.clone(),
                None => self.assign(),
            };
            let sender = self.room_sender(&room_id);

            let (tx, rx) = oneshot::channel();
            let cmd = RoomCommand::JoinRequest {
                participant_id: participant_id.clone(),
                display_name: display_name.clone(),
                media,
                respond_to: tx,
            };
            let result = match sender.send(cmd).await {
                Ok(()) => rx
                    .await
                    .unwrap_or_else(|_| Err(CoordinatorError::RoomClosed(room_id.clone()))),
                Err(_) => Err(CoordinatorError::RoomClosed(room_id.clone())),
            };

            match result {
                Ok(roster) => return Ok((room_id, roster)),
                Err(CoordinatorError::RoomClosed(closed)) => {
                    debug!("Room {} closed under join of {}", closed, participant_id);
                    self.forget_closed(&closed);
                    last_err = Some(CoordinatorError::RoomClosed(closed));
                }
                Err(CoordinatorError::RoomFull(full)) if requested.is_none() => {
                    debug!("Assigned room {} filled up, reassigning", full);
                    last_err = Some(CoordinatorError::RoomFull(full));
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or(CoordinatorError::RoomClosed(RoomId::default())))
    }

    pub async fn leave(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<LeaveOutcome, CoordinatorError> {
        let (room_id, sender) = self.member_room(participant_id)?;

        let (tx, rx) = oneshot::channel();
        let cmd = RoomCommand::Leave {
            participant_id: participant_id.clone(),
            respond_to: tx,
        };
        if sender.send(cmd).await.is_err() {
            return Err(CoordinatorError::RoomClosed(room_id));
        }
        rx.await
            .unwrap_or_else(|_| Err(CoordinatorError::RoomClosed(room_id)))
    }

    /// Routes to the source's room. A source outside every room is
    /// dropped without error.
    pub async fn signal(&self, envelope: SignalEnvelope) -> Result<(), CoordinatorError> {
        let Ok((room_id, sender)) = self.member_room(&envelope.source_id) else {
            debug!(
                "Dropping {} from {}: not in any room",
                envelope.payload.kind(),
                envelope.source_id
            );
            return Ok(());
        };
        send_command(&room_id, &sender, RoomCommand::Signal { envelope }).await
    }

    pub async fn track_received(
        &self,
        owner_id: &ParticipantId,
        source_id: ParticipantId,
    ) -> Result<(), CoordinatorError> {
        let (room_id, sender) = self.member_room(owner_id)?;
        let cmd = RoomCommand::TrackReceived {
            owner_id: owner_id.clone(),
            source_id,
        };
        send_command(&room_id, &sender, cmd).await
    }

    pub async fn connection_failed(
        &self,
        owner_id: &ParticipantId,
        remote_id: ParticipantId,
    ) -> Result<(), CoordinatorError> {
        let (room_id, sender) = self.member_room(owner_id)?;
        let cmd = RoomCommand::ConnectionFailed {
            owner_id: owner_id.clone(),
            remote_id,
        };
        send_command(&room_id, &sender, cmd).await
    }

    /// Applies `command` in the issuer's room.
    pub async fn control(
        &self,
        issuer_id: &ParticipantId,
        command: ControlCommand,
    ) -> Result<(), CoordinatorError> {
        let (room_id, sender) = self.member_room(issuer_id)?;
        let cmd = RoomCommand::Control {
            issuer_id: issuer_id.clone(),
            command,
        };
        send_command(&room_id, &sender, cmd).await
    }

    pub async fn snapshot(&self, room_id: &RoomId) -> Option<RoomSnapshot> {
        let sender = self.inner.rooms.get(room_id)?.sender.clone();
        let (tx, rx) = oneshot::channel();
        sender
            .send(RoomCommand::Snapshot { respond_to: tx })
            .await
            .ok()?;
        rx.await.ok()
    }

    /// Closes every room and waits for their event loops to finish.
    pub async fn shutdown(&self) {
        let room_ids: Vec<RoomId> = self.inner.rooms.iter().map(|e| e.key().clone()).collect();
        let mut tasks = Vec::with_capacity(room_ids.len());
        for room_id in room_ids {
            if let Some((_, entry)) = self.inner.rooms.remove(&room_id) {
                tasks.push(entry.task);
            }
        }

        info!("Shutting down {} rooms", tasks.len());
        for task in tasks {
            let _ = task.await;
        }
    }

    fn assign(&self) -> RoomId {
        let loads: Vec<RoomLoad> = self
            .inner
            .rooms
            .iter()
            .filter(|e| !e.sender.is_closed())
            .map(|e| RoomLoad {
                room_id: e.key().clone(),
                members: e.occupancy.load(Ordering::Acquire),
                opened: e.opened,
            })
            .collect();

        self.inner
            .assigner
            .assign(&loads, self.inner.settings.capacity)
            .unwrap_or_default()
    }

    fn member_room(
        &self,
        participant_id: &ParticipantId,
    ) -> Result<(RoomId, mpsc::Sender<RoomCommand>), CoordinatorError> {
        let room_id = self
            .room_of(participant_id)
            .ok_or_else(|| CoordinatorError::NotFound(participant_id.clone()))?;
        let sender = self
            .inner
            .rooms
            .get(&room_id)
            .map(|e| e.sender.clone())
            .ok_or_else(|| CoordinatorError::RoomClosed(room_id.clone()))?;
        Ok((room_id, sender))
    }

    /// Sender of `room_id`, spawning the room if it is not running.
    fn room_sender(&self, room_id: &RoomId) -> mpsc::Sender<RoomCommand> {
        let entry = self.inner.rooms.entry(room_id.clone()).or_insert_with(|| {
            info!("Creating new room: {}", room_id);
            self.spawn_room(room_id.clone())
        });
        entry.sender.clone()
    }

    fn spawn_room(&self, room_id: RoomId) -> RoomEntry {
        let (tx, rx) = mpsc::channel(self.inner.command_buffer);
        let occupancy = Arc::new(AtomicUsize::new(0));
        let opened = self.inner.next_opened.fetch_add(1, Ordering::Relaxed);

        let room = Room::new(
            room_id.clone(),
            self.inner.services.clone(),
            self.inner.settings,
            rx,
            occupancy.clone(),
        );
        let manager = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            room.run().await;
            if let Some(inner) = manager.upgrade() {
                inner.rooms.remove_if(&room_id, |_, e| e.opened == opened);
            }
        });

        RoomEntry {
            sender: tx,
            occupancy,
            opened,
            task,
        }
    }

    fn forget_closed(&self, room_id: &RoomId) {
        self.inner
            .rooms
            .remove_if(room_id, |_, e| e.sender.is_closed());
    }
}

async fn send_command(
    room_id: &RoomId,
    sender: &mpsc::Sender<RoomCommand>,
    cmd: RoomCommand,
) -> Result<(), CoordinatorError> {
    sender
        .send(cmd)
        .await
        .map_err(|_| CoordinatorError::RoomClosed(room_id.clone()))
}
