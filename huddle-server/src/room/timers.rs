use crate::room::room_event::RoomEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Spawns delayed `RoomEvent`s onto the owning room's event channel.
#[derive(Clone)]
pub struct TimerScheduler {
    event_tx: mpsc::UnboundedSender<RoomEvent>,
}

impl TimerScheduler {
    pub fn new(event_tx: mpsc::UnboundedSender<RoomEvent>) -> Self {
        Self { event_tx }
    }

    pub fn schedule(&self, delay: Duration, event: RoomEvent) -> TimerGuard {
        let tx = self.event_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(event);
        });
        TimerGuard(handle.abort_handle())
    }
}

/// Aborts the pending timer when dropped.
#[derive(Debug)]
pub struct TimerGuard(AbortHandle);

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}
