mod memory;
pub mod runtime;
mod scheduler;
mod traits;
mod types;

pub use memory::{ManualClock, MemoryStore, MemoryWakeService, RecordingFeedback};
pub use runtime::{run, RunSummary};
pub use scheduler::{Settings, WakeupScheduler, WAKEUP_ID_KEY};
pub use traits::{wakeup_target, Clock, Feedback, KeyValueStore, SystemClock, WakeService};
pub use types::{
    Answer, FireOutcome, LaunchReport, Message, ReasonCode, RequestOutcome, TimerId, WakeupEvent,
    WakeupStatus,
};
