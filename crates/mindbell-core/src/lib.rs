//! # mindbell Core Library
//!
//! Core logic for the mindbell mindfulness reminder: one delayed wakeup at a
//! time that asks "are you still aware of your breathing?" when it fires.
//! All operations are available through the standalone CLI; any other front
//! end is a thin layer over this library.
//!
//! ## Architecture
//!
//! - **Wakeup Scheduler**: a state machine over a single persisted timer id,
//!   reconciled against the wake service every time the process starts
//! - **Storage**: SQLite key-value store and wake service, TOML configuration
//! - **Runtime**: async loop delivering live firings to the scheduler
//!
//! ## Key Components
//!
//! - [`WakeupScheduler`]: request, poll and firing handling
//! - [`WakeService`] / [`KeyValueStore`] / [`Feedback`]: collaborator seams
//! - [`Database`] / [`SqliteWakeService`]: durable backends
//! - [`Config`]: application configuration management

pub mod error;
pub mod storage;
pub mod wakeup;

pub use error::{ConfigError, CoreError, DatabaseError, SchedulingError};
pub use storage::{Config, Database, SqliteWakeService};
pub use wakeup::{
    Answer, Clock, Feedback, FireOutcome, KeyValueStore, LaunchReport, Message, RequestOutcome,
    Settings, SystemClock, TimerId, WakeService, WakeupEvent, WakeupScheduler, WakeupStatus,
};
