mod control;
mod media;
mod message;
mod participant;
mod room;
mod signaling;

pub use control::{ConstraintKind, ControlCommand};
pub use media::{MediaProfile, MediaStream, StreamHandle, TrackKind};
pub use message::{ClientMessage, ErrorCode, ServerMessage};
pub use participant::{Participant, ParticipantId, RosterEntry};
pub use room::RoomId;
pub use signaling::{IceServerConfig, SignalEnvelope, SignalPayload};
