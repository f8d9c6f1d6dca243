mod config;
pub mod database;
pub mod wake_service;

pub use config::{Config, NotificationsConfig, ServiceConfig, WakeupConfig, MAX_DELAY_SECS};
pub use database::Database;
pub use wake_service::SqliteWakeService;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `MINDBELL_DATA_DIR` wins when set. Otherwise `~/.config/mindbell[-dev]/`
/// based on `MINDBELL_ENV` (set it to `dev` for the development directory).
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("MINDBELL_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("MINDBELL_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("mindbell-dev")
            } else {
                base_dir.join("mindbell")
            }
        }
    };

    ensure_dir(dir)
}

fn ensure_dir(dir: PathBuf) -> Result<PathBuf, ConfigError> {
    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_dir_creates_nested_directories() {
        let root = tempfile::tempdir().unwrap();
        let dir = ensure_dir(root.path().join("a").join("b")).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn ensure_dir_failure_is_a_data_dir_error() {
        let root = tempfile::tempdir().unwrap();
        let file = root.path().join("occupied");
        std::fs::write(&file, "").unwrap();

        let err = ensure_dir(file.join("mindbell")).unwrap_err();
        assert!(matches!(err, ConfigError::DataDir(ref msg) if msg.contains("occupied")));
    }
}
