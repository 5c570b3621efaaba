use huddle_core::{ConstraintKind, ParticipantId};

/// Events a room schedules for itself. Each carries the generation of the
/// record it was scheduled for; a mismatch means the record was replaced or
/// cancelled and the event is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    ConstraintExpired {
        target_id: ParticipantId,
        kind: ConstraintKind,
        generation: u64,
    },
    NegotiationDeadline {
        owner_id: ParticipantId,
        remote_id: ParticipantId,
        generation: u64,
    },
}
