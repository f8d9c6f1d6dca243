//! In-process backends.
//!
//! Used by tests and by embedders that bring their own persistence. The wake
//! service reads time from an injected [`Clock`] so it can share a
//! [`ManualClock`] with the scheduler.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::traits::{wakeup_target, Clock, Feedback, KeyValueStore, SystemClock, WakeService};
use super::types::{Message, ReasonCode, TimerId, WakeupEvent};
use crate::error::SchedulingError;

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.millis.store(to.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// Key-value store backed by a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn write_int(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
    }

    fn read_int(&self, key: &str) -> i64 {
        self.values.get(key).copied().unwrap_or(0)
    }

    fn delete(&mut self, key: &str) {
        self.values.remove(key);
    }
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    target: DateTime<Utc>,
    reason: ReasonCode,
}

/// Wake service holding its schedule in memory.
#[derive(Debug, Clone)]
pub struct MemoryWakeService<C = SystemClock> {
    clock: C,
    next_id: i64,
    capacity: usize,
    pending: BTreeMap<TimerId, Scheduled>,
    launch: Option<WakeupEvent>,
    schedule_calls: usize,
}

impl MemoryWakeService<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryWakeService<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryWakeService<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            next_id: 1,
            capacity: usize::MAX,
            pending: BTreeMap::new(),
            launch: None,
            schedule_calls: 0,
        }
    }

    /// Refuse schedules once `capacity` wakeups are live.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Register a wakeup under a caller-chosen id.
    pub fn insert(&mut self, id: TimerId, target: DateTime<Utc>, reason: ReasonCode) {
        self.pending.insert(id, Scheduled { target, reason });
        self.next_id = self.next_id.max(id.get().saturating_add(1));
    }

    /// Drop a wakeup without delivering it, as if the service lost it.
    pub fn forget(&mut self, id: TimerId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Mark the next launch as caused by `event`. The matching live wakeup,
    /// if any, is consumed.
    pub fn set_launch_event(&mut self, event: WakeupEvent) {
        self.pending.remove(&event.id);
        self.launch = Some(event);
    }

    pub fn live_count(&self) -> usize {
        self.pending.len()
    }

    /// How many times `schedule` succeeded.
    pub fn schedule_calls(&self) -> usize {
        self.schedule_calls
    }
}

impl<C: Clock> WakeService for MemoryWakeService<C> {
    fn schedule(&mut self, delay_secs: i64, reason: ReasonCode) -> Result<TimerId, SchedulingError> {
        let target = wakeup_target(self.clock.now(), delay_secs)?;
        if self.pending.len() >= self.capacity {
            return Err(SchedulingError::Exhausted {
                limit: self.capacity,
            });
        }
        let id = TimerId::from_raw(self.next_id)
            .ok_or_else(|| SchedulingError::Backend("timer id space exhausted".to_string()))?;
        self.next_id = self.next_id.saturating_add(1);
        self.pending.insert(id, Scheduled { target, reason });
        self.schedule_calls += 1;
        Ok(id)
    }

    fn query(&self, id: TimerId) -> Option<DateTime<Utc>> {
        self.pending.get(&id).map(|s| s.target)
    }

    fn launch_event(&mut self) -> Option<WakeupEvent> {
        self.launch.take()
    }

    fn take_fired(&mut self, now: DateTime<Utc>) -> Vec<WakeupEvent> {
        let due: Vec<TimerId> = self
            .pending
            .iter()
            .filter(|(_, s)| s.target <= now)
            .map(|(id, _)| *id)
            .collect();
        due.into_iter()
            .filter_map(|id| {
                self.pending
                    .remove(&id)
                    .map(|s| WakeupEvent::new(id, s.reason))
            })
            .collect()
    }
}

/// Feedback sink that remembers everything it was asked to show.
#[derive(Debug, Clone, Default)]
pub struct RecordingFeedback {
    pub messages: Vec<Message>,
    pub pulses: usize,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.pulses = 0;
    }
}

impl Feedback for RecordingFeedback {
    fn show_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    fn pulse_feedback(&mut self) {
        self.pulses += 1;
    }
}
