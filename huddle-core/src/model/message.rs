use crate::model::control::{ConstraintKind, ControlCommand};
use crate::model::participant::{ParticipantId, RosterEntry};
use crate::model::room::RoomId;
use crate::model::signaling::{IceServerConfig, SignalPayload};
use serde::{Deserialize, Serialize};

fn enabled() -> bool {
    true
}

/// Frames sent by a client over its transport channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    Join {
        display_name: String,
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default = "enabled")]
        audio: bool,
        #[serde(default = "enabled")]
        video: bool,
    },
    Leave,
    Signal {
        target_id: ParticipantId,
        payload: SignalPayload,
    },
    /// First remote media track from `source_id` arrived at this client.
    TrackReceived {
        source_id: ParticipantId,
    },
    /// This client's connection to `remote_id` failed at the transport level.
    ConnectionFailed {
        remote_id: ParticipantId,
    },
    Control {
        command: ControlCommand,
    },
}

/// Frames the coordinator pushes to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    Welcome {
        participant_id: ParticipantId,
    },
    RoomAssigned {
        room_id: RoomId,
    },
    RosterUpdated(Vec<RosterEntry>),
    Signal {
        source_id: ParticipantId,
        payload: SignalPayload,
    },
    /// This client is the initiator towards `peer_id` and should offer now.
    BeginOffer {
        peer_id: ParticipantId,
    },
    /// The connection to `peer_id` is gone; drop its tile.
    PeerClosed {
        peer_id: ParticipantId,
    },
    ConstraintApplied {
        kind: ConstraintKind,
        duration_seconds: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        partner_id: Option<ParticipantId>,
    },
    ConstraintLifted {
        kind: ConstraintKind,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorCode {
    DuplicateJoin,
    NotFound,
    InvalidSignalTarget,
    NegotiationTimeout,
    TransportFailure,
    RoomFull,
    RoomClosed,
    BadRequest,
}
