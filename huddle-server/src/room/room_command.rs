use crate::errors::CoordinatorError;
use crate::room::coordinator::{LeaveOutcome, RoomSnapshot};
use huddle_core::{
    ControlCommand, MediaProfile, ParticipantId, RosterEntry, SignalEnvelope,
};
use tokio::sync::oneshot;

/// Commands a room receives from the transport layer.
///
/// Fire-and-forget commands report their failures to the originating
/// participant directly.
#[derive(Debug)]
pub enum RoomCommand {
    JoinRequest {
        participant_id: ParticipantId,
        display_name: String,
        media: MediaProfile,
        respond_to: oneshot::Sender<Result<Vec<RosterEntry>, CoordinatorError>>,
    },

    /// Explicit leave or closed socket.
    Leave {
        participant_id: ParticipantId,
        respond_to: oneshot::Sender<Result<LeaveOutcome, CoordinatorError>>,
    },

    Signal { envelope: SignalEnvelope },

    TrackReceived {
        owner_id: ParticipantId,
        source_id: ParticipantId,
    },

    ConnectionFailed {
        owner_id: ParticipantId,
        remote_id: ParticipantId,
    },

    Control {
        issuer_id: ParticipantId,
        command: ControlCommand,
    },

    Snapshot {
        respond_to: oneshot::Sender<RoomSnapshot>,
    },
}
