use crate::room::{RoomEvent, TimerGuard, TimerScheduler};
use crate::signaling::SignalingOutput;
use huddle_core::{ConstraintKind, ParticipantId, ServerMessage, StreamHandle, TrackKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Longest duration a control command may ask for.
pub const MAX_CONSTRAINT_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// A temporary restriction on one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub target_id: ParticipantId,
    pub kind: ConstraintKind,
    pub expires_at: Instant,
    /// The other half of a private pair.
    pub partner_id: Option<ParticipantId>,
}

struct ActiveConstraint {
    constraint: Constraint,
    generation: u64,
    /// Stream whose audio was disabled; dropped unreverted on cancel.
    muted_stream: Option<StreamHandle>,
    _timer: TimerGuard,
}

/// Applies timed constraints and reverts them on expiry.
///
/// One record per (target, kind): a newer constraint replaces the older
/// one's expiry instead of stacking.
pub struct ConstraintApplier {
    active: HashMap<(ParticipantId, ConstraintKind), ActiveConstraint>,
    next_generation: u64,
    timers: TimerScheduler,
    output: Arc<dyn SignalingOutput>,
}

impl ConstraintApplier {
    pub fn new(timers: TimerScheduler, output: Arc<dyn SignalingOutput>) -> Self {
        Self {
            active: HashMap::new(),
            next_generation: 1,
            timers,
            output,
        }
    }

    /// Disables `stream`'s audio until `duration` elapses.
    pub fn mute(&mut self, target_id: &ParticipantId, stream: &StreamHandle, duration: Duration) {
        if !stream.set_enabled(TrackKind::Audio, false) {
            debug!("{} has no audio track to mute", target_id);
        }
        self.install(
            target_id,
            ConstraintKind::Mute,
            duration,
            None,
            Some(stream.clone()),
        );
        info!("Muted {} for {:?}", target_id, duration);
    }

    /// Tells exactly `first` and `second` they are paired for `duration`.
    /// A previous partner of either one is released.
    pub fn private_pair(
        &mut self,
        first: &ParticipantId,
        second: &ParticipantId,
        duration: Duration,
    ) {
        self.release_previous_partner(first, second);
        self.release_previous_partner(second, first);

        self.install(
            first,
            ConstraintKind::PrivatePair,
            duration,
            Some(second.clone()),
            None,
        );
        self.install(
            second,
            ConstraintKind::PrivatePair,
            duration,
            Some(first.clone()),
            None,
        );
        info!(
            "Private pair {} <-> {} for {:?}",
            first, second, duration
        );
    }

    /// Reverts a constraint whose timer fired. Ignored if the record was
    /// replaced or cancelled since the timer was armed.
    pub fn expire(
        &mut self,
        target_id: &ParticipantId,
        kind: ConstraintKind,
        generation: u64,
    ) -> Option<Constraint> {
        let key = (target_id.clone(), kind);
        let current = self.active.get(&key).map(|a| a.generation);
        if current != Some(generation) {
            debug!(
                "Ignoring stale {:?} expiry for {} (generation {})",
                kind, target_id, generation
            );
            return None;
        }

        let active = self.active.remove(&key)?;
        Some(self.lift(active))
    }

    /// Drops every constraint on a departing participant without reverting
    /// it. A private-pair partner still present is released immediately.
    pub fn cancel_for(&mut self, participant_id: &ParticipantId) {
        let keys: Vec<_> = self
            .active
            .keys()
            .filter(|(target, _)| target == participant_id)
            .cloned()
            .collect();

        for key in keys {
            let Some(active) = self.active.remove(&key) else {
                continue;
            };
            debug!(
                "Cancelled {:?} on departed {}",
                active.constraint.kind, participant_id
            );

            if let Some(partner) = active.constraint.partner_id {
                self.lift_pair_side(&partner, participant_id);
            }
        }
    }

    pub fn get(&self, target_id: &ParticipantId, kind: ConstraintKind) -> Option<&Constraint> {
        self.active
            .get(&(target_id.clone(), kind))
            .map(|a| &a.constraint)
    }

    pub fn active(&self) -> Vec<Constraint> {
        self.active.values().map(|a| a.constraint.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Cancels all timers without reverting anything.
    pub fn clear(&mut self) {
        self.active.clear();
    }

    fn release_previous_partner(&mut self, member: &ParticipantId, new_partner: &ParticipantId) {
        let previous = self
            .get(member, ConstraintKind::PrivatePair)
            .and_then(|c| c.partner_id.clone());
        if let Some(previous) = previous.filter(|p| p != new_partner) {
            debug!("{} leaves its pairing with {}", member, previous);
            self.lift_pair_side(&previous, member);
        }
    }

    /// Lifts `target`'s private pair only while it still names `partner`.
    fn lift_pair_side(&mut self, target: &ParticipantId, partner: &ParticipantId) {
        let key = (target.clone(), ConstraintKind::PrivatePair);
        let still_paired = self
            .active
            .get(&key)
            .is_some_and(|a| a.constraint.partner_id.as_ref() == Some(partner));
        if !still_paired {
            return;
        }
        if let Some(active) = self.active.remove(&key) {
            self.lift(active);
        }
    }

    fn install(
        &mut self,
        target_id: &ParticipantId,
        kind: ConstraintKind,
        duration: Duration,
        partner_id: Option<ParticipantId>,
        muted_stream: Option<StreamHandle>,
    ) {
        let generation = self.next_generation;
        self.next_generation += 1;

        let timer = self.timers.schedule(
            duration,
            RoomEvent::ConstraintExpired {
                target_id: target_id.clone(),
                kind,
                generation,
            },
        );
        let constraint = Constraint {
            target_id: target_id.clone(),
            kind,
            expires_at: Instant::now() + duration,
            partner_id: partner_id.clone(),
        };

        let replaced = self.active.insert(
            (target_id.clone(), kind),
            ActiveConstraint {
                constraint,
                generation,
                muted_stream,
                _timer: timer,
            },
        );
        if replaced.is_some() {
            debug!("{:?} on {} replaced by a newer one", kind, target_id);
        }

        self.notify(
            target_id,
            ServerMessage::ConstraintApplied {
                kind,
                duration_seconds: duration.as_secs(),
                partner_id,
            },
        );
    }

    fn lift(&self, active: ActiveConstraint) -> Constraint {
        let ActiveConstraint {
            constraint,
            muted_stream,
            ..
        } = active;

        if let Some(stream) = muted_stream {
            stream.set_enabled(TrackKind::Audio, true);
        }
        info!("Lifted {:?} on {}", constraint.kind, constraint.target_id);
        self.notify(
            &constraint.target_id,
            ServerMessage::ConstraintLifted {
                kind: constraint.kind,
            },
        );
        constraint
    }

    fn notify(&self, participant_id: &ParticipantId, message: ServerMessage) {
        if let Err(e) = self.output.send(participant_id, message) {
            warn!("Failed to deliver constraint notice: {}", e);
        }
    }
}
