//! Collaborators the scheduler drives.
//!
//! The scheduler only ever calls outward through these traits. Storage and
//! wake-service backends live in [`crate::storage`] (SQLite) and
//! [`super::memory`] (in-process).

use chrono::{DateTime, Duration, Utc};

use super::types::{Message, ReasonCode, TimerId, WakeupEvent};
use crate::error::SchedulingError;

/// Source of one-shot delayed wakeups.
pub trait WakeService {
    /// Schedule a wakeup `delay_secs` from now. Must return a positive id.
    fn schedule(&mut self, delay_secs: i64, reason: ReasonCode) -> Result<TimerId, SchedulingError>;

    /// Target time of a live wakeup, or `None` once it is unknown or consumed.
    fn query(&self, id: TimerId) -> Option<DateTime<Utc>>;

    /// The firing that caused this process to start, if any.
    ///
    /// Consumes the event: a second call returns `None` and live delivery
    /// will not repeat it.
    fn launch_event(&mut self) -> Option<WakeupEvent>;

    /// Firings that came due at or before `now`, consumed on return.
    fn take_fired(&mut self, now: DateTime<Utc>) -> Vec<WakeupEvent>;
}

/// Target time `delay_secs` after `now`.
///
/// Negative delays and targets chrono cannot represent are both an
/// [`SchedulingError::InvalidDelay`].
pub fn wakeup_target(
    now: DateTime<Utc>,
    delay_secs: i64,
) -> Result<DateTime<Utc>, SchedulingError> {
    if delay_secs < 0 {
        return Err(SchedulingError::InvalidDelay { delay_secs });
    }
    Duration::try_seconds(delay_secs)
        .and_then(|delay| now.checked_add_signed(delay))
        .ok_or(SchedulingError::InvalidDelay { delay_secs })
}

/// Durable integer slots keyed by name.
///
/// Leaf contract: reads of an absent key return `0`, deleting an absent key
/// is a no-op, and none of the operations fail from the caller's view.
pub trait KeyValueStore {
    fn write_int(&mut self, key: &str, value: i64);
    fn read_int(&self, key: &str) -> i64;
    fn delete(&mut self, key: &str);
}

/// Display and haptic output. Pure sink; nothing flows back.
pub trait Feedback {
    fn show_message(&mut self, message: Message);
    fn pulse_feedback(&mut self);
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
