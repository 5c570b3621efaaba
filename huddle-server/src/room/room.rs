use crate::room::coordinator::{Coordinator, RoomServices, RoomSettings};
use crate::room::room_command::RoomCommand;
use crate::room::room_event::RoomEvent;
use crate::room::timers::TimerScheduler;
use huddle_core::RoomId;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Serializes every mutation of one room: commands from clients and the
/// room's own timer events are handled one at a time.
pub struct Room {
    coordinator: Coordinator,
    command_rx: mpsc::Receiver<RoomCommand>,
    event_rx: mpsc::UnboundedReceiver<RoomEvent>,
    occupancy: Arc<AtomicUsize>,
}

impl Room {
    pub fn new(
        room_id: RoomId,
        services: RoomServices,
        settings: RoomSettings,
        command_rx: mpsc::Receiver<RoomCommand>,
        occupancy: Arc<AtomicUsize>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let coordinator = Coordinator::new(
            room_id,
            services,
            TimerScheduler::new(event_tx),
            settings,
        );

        Self {
            coordinator,
            command_rx,
            event_rx,
            occupancy,
        }
    }

    /// Runs until the last member leaves or every sender is dropped.
    pub async fn run(mut self) {
        info!("Room {} event loop started", self.coordinator.room_id());

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(c) => {
                            if !self.handle_command(c) {
                                info!("Room {} is empty. Closing.", self.coordinator.room_id());
                                break;
                            }
                        }
                        None => {
                            info!("Command channel closed. Shutting down room.");
                            break;
                        }
                    }
                }

                Some(evt) = self.event_rx.recv() => {
                    self.coordinator.on_room_event(evt);
                }
            }
        }

        self.command_rx.close();
        self.coordinator.shutdown();
        self.occupancy.store(0, Ordering::Release);
        info!("Room {} event loop finished", self.coordinator.room_id());
    }

    /// Returns `false` once the room has no members left.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::JoinRequest {
                participant_id,
                display_name,
                media,
                respond_to,
            } => {
                let result = self
                    .coordinator
                    .on_join_request(participant_id, display_name, media);
                self.update_occupancy();
                let _ = respond_to.send(result);
                !self.coordinator.is_empty()
            }

            RoomCommand::Leave {
                participant_id,
                respond_to,
            } => {
                let result = self.coordinator.on_leave_or_disconnect(&participant_id);
                self.update_occupancy();
                let _ = respond_to.send(result);
                !self.coordinator.is_empty()
            }

            RoomCommand::Signal { envelope } => {
                let source_id = envelope.source_id.clone();
                if let Err(e) = self.coordinator.on_signal_received(envelope) {
                    self.coordinator.report_error(&source_id, &e);
                }
                true
            }

            RoomCommand::TrackReceived {
                owner_id,
                source_id,
            } => {
                if !self.coordinator.on_track_received(&owner_id, &source_id) {
                    debug!("Ignored track report {} <- {}", owner_id, source_id);
                }
                true
            }

            RoomCommand::ConnectionFailed {
                owner_id,
                remote_id,
            } => {
                self.coordinator.on_connection_failed(&owner_id, &remote_id);
                true
            }

            RoomCommand::Control { issuer_id, command } => {
                if let Err(e) = self.coordinator.on_control_command(&issuer_id, command) {
                    self.coordinator.report_error(&issuer_id, &e);
                }
                true
            }

            RoomCommand::Snapshot { respond_to } => {
                let _ = respond_to.send(self.coordinator.snapshot());
                true
            }
        }
    }

    fn update_occupancy(&self) {
        self.occupancy
            .store(self.coordinator.member_count(), Ordering::Release);
    }
}
