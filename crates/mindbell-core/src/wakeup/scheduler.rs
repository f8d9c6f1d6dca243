//! Wakeup scheduler.
//!
//! A small state machine over one persisted slot: the id of the wakeup we
//! believe is outstanding. The target time lives only inside the wake
//! service, so every process start reconciles the two.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --request--> Pending --fired--> (Fired) --> Idle
//!                   Pending --stale record found--> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let (mut scheduler, report) =
//!     WakeupScheduler::launch(service, store, feedback, SystemClock, settings);
//! scheduler.request_wakeup()?;
//! // From the event loop:
//! scheduler.dispatch_fired();
//! ```

use chrono::Duration;
use tracing::{debug, info, warn};

use super::traits::{wakeup_target, Clock, Feedback, KeyValueStore, WakeService};
use super::types::{
    Answer, FireOutcome, LaunchReport, Message, ReasonCode, RequestOutcome, TimerId, WakeupEvent,
    WakeupStatus,
};
use crate::error::SchedulingError;

/// Store key holding the outstanding [`TimerId`].
pub const WAKEUP_ID_KEY: &str = "wakeup_id";

/// Delay and reason used by [`WakeupScheduler::request_wakeup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub delay: Duration,
    pub reason: ReasonCode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            delay: Duration::seconds(240),
            reason: 0,
        }
    }
}

pub struct WakeupScheduler<W, S, F, C> {
    service: W,
    store: S,
    feedback: F,
    clock: C,
    settings: Settings,
    /// Last firing handled by this process; a repeat is a duplicate delivery.
    last_fired: Option<TimerId>,
}

impl<W, S, F, C> WakeupScheduler<W, S, F, C>
where
    W: WakeService,
    S: KeyValueStore,
    F: Feedback,
    C: Clock,
{
    /// Start the scheduler for this process.
    ///
    /// Reconciliation runs here, before any other operation can be reached.
    /// If the launch was caused by a firing, that firing is handled and the
    /// status path is skipped; otherwise the current status is rendered.
    pub fn launch(
        service: W,
        store: S,
        feedback: F,
        clock: C,
        settings: Settings,
    ) -> (Self, LaunchReport) {
        let mut scheduler = Self {
            service,
            store,
            feedback,
            clock,
            settings,
            last_fired: None,
        };
        let report = scheduler.reconcile();
        (scheduler, report)
    }

    fn reconcile(&mut self) -> LaunchReport {
        if let Some(event) = self.service.launch_event() {
            info!(id = %event.id, reason = event.reason, "launched by wakeup");
            let outcome = self.on_fired(event);
            return LaunchReport::Fired { event, outcome };
        }

        let status = self.poll_status();
        let message = match status {
            WakeupStatus::Idle => Message::Prompt,
            WakeupStatus::Pending { remaining, .. } => Message::Remaining {
                seconds: remaining.num_seconds(),
            },
        };
        self.feedback.show_message(message);
        LaunchReport::Status { status }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn service(&self) -> &W {
        &self.service
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    pub fn feedback_mut(&mut self) -> &mut F {
        &mut self.feedback
    }

    pub fn into_parts(self) -> (W, S, F, C) {
        (self.service, self.store, self.feedback, self.clock)
    }

    fn stored_id(&self) -> Option<TimerId> {
        TimerId::from_raw(self.store.read_int(WAKEUP_ID_KEY))
    }

    /// Current status, checked against the wake service.
    ///
    /// A stored id the service no longer knows is a wakeup that fired while
    /// nobody was listening: the record is deleted and `Idle` returned. That
    /// cleanup is the only mutation; the service schedule is never touched.
    pub fn poll_status(&mut self) -> WakeupStatus {
        let Some(id) = self.stored_id() else {
            return WakeupStatus::Idle;
        };
        match self.service.query(id) {
            Some(target) => {
                let remaining = target - self.clock.now();
                debug!(%id, remaining_secs = remaining.num_seconds(), "wakeup pending");
                WakeupStatus::Pending {
                    id,
                    target,
                    remaining,
                }
            }
            None => {
                warn!(%id, "stored wakeup unknown to wake service; clearing record");
                self.store.delete(WAKEUP_ID_KEY);
                WakeupStatus::Idle
            }
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Schedule a wakeup with the configured delay and reason.
    pub fn request_wakeup(&mut self) -> Result<RequestOutcome, SchedulingError> {
        let Settings { delay, reason } = self.settings;
        self.request_wakeup_with(delay, reason)
    }

    /// Schedule exactly one wakeup unless one is already live.
    ///
    /// When one is live nothing is scheduled and the remaining time is
    /// reported instead, so repeated calls never stack timers. A refusal from
    /// the wake service is returned as-is and nothing is persisted.
    pub fn request_wakeup_with(
        &mut self,
        delay: Duration,
        reason: ReasonCode,
    ) -> Result<RequestOutcome, SchedulingError> {
        if let WakeupStatus::Pending { id, remaining, .. } = self.poll_status() {
            self.feedback.show_message(Message::Remaining {
                seconds: remaining.num_seconds(),
            });
            return Ok(RequestOutcome::AlreadyPending { id, remaining });
        }

        let delay_secs = delay.num_seconds();
        let expected = wakeup_target(self.clock.now(), delay_secs)?;
        let id = self.service.schedule(delay_secs, reason)?;
        self.store.write_int(WAKEUP_ID_KEY, id.get());
        let target = self.service.query(id).unwrap_or(expected);

        info!(%id, delay_secs, reason, %target, "wakeup scheduled");
        self.feedback.show_message(Message::Scheduled { delay_secs });
        Ok(RequestOutcome::Scheduled { id, target })
    }

    /// Handle a firing, live or launch-supplied.
    ///
    /// A firing is proof the wakeup happened whatever the store says: the
    /// record is deleted (absent is fine) and the user notified. The same id
    /// delivered again is a duplicate and does nothing. Firings that match
    /// neither the stored id nor our reason code belong to someone else.
    pub fn on_fired(&mut self, event: WakeupEvent) -> FireOutcome {
        if self.last_fired == Some(event.id) {
            debug!(id = %event.id, "duplicate wakeup delivery ignored");
            return FireOutcome::Duplicate;
        }

        let stored = self.stored_id();
        if stored != Some(event.id) && event.reason != self.settings.reason {
            debug!(id = %event.id, reason = event.reason, "wakeup with foreign reason ignored");
            return FireOutcome::Ignored;
        }
        if let Some(other) = stored.filter(|id| *id != event.id) {
            warn!(stored = %other, fired = %event.id, "fired id differs from stored record");
        }

        self.store.delete(WAKEUP_ID_KEY);
        self.last_fired = Some(event.id);

        info!(id = %event.id, reason = event.reason, "wakeup fired");
        self.feedback.show_message(Message::Fired);
        self.feedback.pulse_feedback();
        FireOutcome::Handled
    }

    /// Deliver every firing the service has come due with.
    pub fn dispatch_fired(&mut self) -> Vec<(WakeupEvent, FireOutcome)> {
        let now = self.clock.now();
        self.service
            .take_fired(now)
            .into_iter()
            .map(|event| (event, self.on_fired(event)))
            .collect()
    }

    /// Render the user's answer to the "still aware?" prompt.
    pub fn acknowledge(&mut self, answer: Answer) {
        self.feedback.show_message(Message::Acknowledged { answer });
    }
}
