use crate::model::participant::ParticipantId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Opaque negotiation message exchanged between the two ends of a pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum SignalPayload {
    Offer {
        sdp: String,
    },
    Answer {
        sdp: String,
    },
    IceCandidate {
        candidate: String,
        sdp_mid: Option<String>,
        #[serde(rename = "sdpMLineIndex")]
        sdp_m_line_index: Option<u16>,
    },
}

impl SignalPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::IceCandidate { .. } => "iceCandidate",
        }
    }

    /// An offer (or a candidate for one) may open a negotiation on the
    /// receiving side; an answer only completes one it started itself.
    pub fn can_open_negotiation(&self) -> bool {
        !matches!(self, Self::Answer { .. })
    }

    pub fn is_well_formed(&self) -> bool {
        match self {
            Self::Offer { sdp } | Self::Answer { sdp } => !sdp.trim().is_empty(),
            Self::IceCandidate { candidate, .. } => !candidate.trim().is_empty(),
        }
    }
}

/// A payload in flight between two participants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalEnvelope {
    pub source_id: ParticipantId,
    pub target_id: ParticipantId,
    pub payload: SignalPayload,
}

impl SignalEnvelope {
    pub fn new(source_id: ParticipantId, target_id: ParticipantId, payload: SignalPayload) -> Self {
        Self {
            source_id,
            target_id,
            payload,
        }
    }
}
