pub mod config;
pub mod wakeup;
