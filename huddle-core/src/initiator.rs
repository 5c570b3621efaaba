//! Deterministic choice of the offering side for a pair of participants.
//!
//! Both ends evaluate the same rule on the same two ids, so they agree on
//! who offers without exchanging anything, and glare cannot happen.

use crate::model::ParticipantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Initiator,
    Responder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairRoles {
    pub initiator: ParticipantId,
    pub responder: ParticipantId,
}

/// The smaller id (byte-wise lexicographic) initiates.
pub fn resolve_initiator(a: &ParticipantId, b: &ParticipantId) -> PairRoles {
    let (initiator, responder) = if a <= b { (a, b) } else { (b, a) };
    PairRoles {
        initiator: initiator.clone(),
        responder: responder.clone(),
    }
}

/// Role `local` plays towards `remote`.
pub fn local_role(local: &ParticipantId, remote: &ParticipantId) -> Role {
    if local <= remote {
        Role::Initiator
    } else {
        Role::Responder
    }
}
