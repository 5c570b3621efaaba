use huddle_core::{ErrorCode, ParticipantId, RoomId};
use thiserror::Error;

/// Failures surfaced by coordinator entry points.
///
/// Everything except `NegotiationTimeout` and `TransportFailure` is a
/// rejection: room state is left untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    #[error("participant {0} is already a member of a room")]
    DuplicateJoin(ParticipantId),

    #[error("participant {0} not found")]
    NotFound(ParticipantId),

    #[error("cannot route {payload} from {source_id} to {target_id}: {reason}")]
    InvalidSignalTarget {
        source_id: ParticipantId,
        target_id: ParticipantId,
        payload: &'static str,
        reason: &'static str,
    },

    #[error("negotiation between {owner_id} and {remote_id} timed out")]
    NegotiationTimeout {
        owner_id: ParticipantId,
        remote_id: ParticipantId,
    },

    #[error("transport failure towards {0}: {1}")]
    TransportFailure(ParticipantId, String),

    #[error("room {0} is full")]
    RoomFull(RoomId),

    #[error("room {0} is closed")]
    RoomClosed(RoomId),

    #[error("invalid control command: {0}")]
    InvalidCommand(String),
}

impl CoordinatorError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::DuplicateJoin(_) => ErrorCode::DuplicateJoin,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::InvalidSignalTarget { .. } => ErrorCode::InvalidSignalTarget,
            Self::NegotiationTimeout { .. } => ErrorCode::NegotiationTimeout,
            Self::TransportFailure(..) => ErrorCode::TransportFailure,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::RoomClosed(_) => ErrorCode::RoomClosed,
            Self::InvalidCommand(_) => ErrorCode::BadRequest,
        }
    }
}

impl From<TransportError> for CoordinatorError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Disconnected(id) => {
                Self::TransportFailure(id, "channel closed".to_owned())
            }
            TransportError::Encode(id, e) => Self::TransportFailure(id, e),
        }
    }
}

/// Failures of the outbound transport channel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("participant {0} has no open channel")]
    Disconnected(ParticipantId),

    #[error("failed to encode message for {0}: {1}")]
    Encode(ParticipantId, String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}
