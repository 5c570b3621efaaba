use crate::model::participant::ParticipantId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConstraintKind {
    /// Target's outgoing audio is disabled for the duration.
    Mute,
    /// Two participants are told they are in a timed private exchange.
    /// Advisory only; media routing is unchanged.
    PrivatePair,
}

/// Moderator command, decided by an external policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ControlCommand {
    Mute {
        target_id: ParticipantId,
        duration_seconds: u64,
    },
    PrivatePair {
        first_id: ParticipantId,
        second_id: ParticipantId,
        duration_seconds: u64,
    },
}

impl ControlCommand {
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Self::Mute { .. } => ConstraintKind::Mute,
            Self::PrivatePair { .. } => ConstraintKind::PrivatePair,
        }
    }

    pub fn duration_seconds(&self) -> u64 {
        match self {
            Self::Mute {
                duration_seconds, ..
            }
            | Self::PrivatePair {
                duration_seconds, ..
            } => *duration_seconds,
        }
    }
}
