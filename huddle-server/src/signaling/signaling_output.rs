use crate::errors::{CoordinatorError, TransportError};
use huddle_core::{ParticipantId, ServerMessage};
use tracing::{debug, warn};

/// Outbound half of the transport channel (WebSocket server, test harness).
///
/// `send` must not block: it queues the frame and returns. Delivery is
/// ordered per participant.
pub trait SignalingOutput: Send + Sync {
    fn send(&self, participant_id: &ParticipantId, message: ServerMessage)
    -> Result<(), TransportError>;
}

/// Sends `err` back to the participant whose request caused it.
pub fn report_error(
    output: &dyn SignalingOutput,
    participant_id: &ParticipantId,
    err: &CoordinatorError,
) {
    warn!("Reporting to {}: {}", participant_id, err);
    let message = ServerMessage::Error {
        code: err.error_code(),
        message: err.to_string(),
    };
    if let Err(e) = output.send(participant_id, message) {
        debug!("Could not report error to {}: {}", participant_id, e);
    }
}
