use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Reason code carried by a scheduled wakeup and handed back when it fires.
pub type ReasonCode = i32;

/// Handle to one outstanding wakeup, issued by the wake service.
///
/// Only positive values name a wakeup; zero and negatives are the
/// "nothing scheduled" sentinel used by the key-value store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(i64);

impl TimerId {
    /// Interpret a raw integer, returning `None` for the sentinel range.
    pub fn from_raw(raw: i64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A firing, delivered either live or as the cause of a process launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeupEvent {
    pub id: TimerId,
    pub reason: ReasonCode,
}

impl WakeupEvent {
    pub fn new(id: TimerId, reason: ReasonCode) -> Self {
        Self { id, reason }
    }
}

/// What `poll_status` observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum WakeupStatus {
    Idle,
    Pending {
        id: TimerId,
        target: DateTime<Utc>,
        /// Negative once the target has passed without delivery.
        #[serde(with = "signed_seconds")]
        remaining: Duration,
    },
}

impl WakeupStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, WakeupStatus::Pending { .. })
    }

    pub fn pending_id(&self) -> Option<TimerId> {
        match self {
            WakeupStatus::Pending { id, .. } => Some(*id),
            WakeupStatus::Idle => None,
        }
    }
}

/// Result of a wakeup request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RequestOutcome {
    Scheduled {
        id: TimerId,
        target: DateTime<Utc>,
    },
    /// A wakeup was already live; nothing new was scheduled.
    AlreadyPending {
        id: TimerId,
        #[serde(with = "signed_seconds")]
        remaining: Duration,
    },
}

/// Result of handing a firing to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireOutcome {
    /// Record cleared, user notified.
    Handled,
    /// Same firing already handled in this process.
    Duplicate,
    /// Neither our stored id nor our reason code.
    Ignored,
}

/// Which path process-start reconciliation took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum LaunchReport {
    /// The launch itself was caused by a firing.
    Fired {
        event: WakeupEvent,
        outcome: FireOutcome,
    },
    /// Ordinary launch; current status was rendered.
    Status { status: WakeupStatus },
}

/// The user's answer to the "still aware?" prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Aware,
    Distracted,
}

/// Text the scheduler asks the display to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    Prompt,
    Scheduled { delay_secs: i64 },
    Remaining { seconds: i64 },
    Fired,
    Acknowledged { answer: Answer },
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Prompt => {
                write!(f, "Run `start` and begin being aware of your breathing.")
            }
            Message::Scheduled { delay_secs } => write!(
                f,
                "I will ask whether you stayed aware of your breathing in {}.\nYou can close me!",
                human_delay(*delay_secs)
            ),
            Message::Remaining { seconds } if *seconds >= 0 => write!(
                f,
                "You still have to be aware for {seconds} seconds from now! Run `status` to update the remaining time."
            ),
            Message::Remaining { seconds } => write!(
                f,
                "Your check-in is {} seconds overdue and will arrive shortly.",
                seconds.saturating_neg()
            ),
            Message::Fired => write!(
                f,
                "Still aware?\nAnswer `aware` if yes, `distracted` if no."
            ),
            Message::Acknowledged { answer: Answer::Aware } => {
                write!(f, "Well done. Keep watching your breath.")
            }
            Message::Acknowledged {
                answer: Answer::Distracted,
            } => write!(f, "Noticed. Return to your breath and start again."),
        }
    }
}

fn human_delay(secs: i64) -> String {
    match secs {
        s if s >= 60 && s % 60 == 0 => {
            let minutes = s / 60;
            if minutes == 1 {
                "1 minute".to_string()
            } else {
                format!("{minutes} minutes")
            }
        }
        1 => "1 second".to_string(),
        s => format!("{s} seconds"),
    }
}

mod signed_seconds {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        i64::deserialize(d).map(Duration::seconds)
    }
}
