//! Environment-driven CLI configuration.
//!
//! # Invariants
//! - Unset or blank variables fall back to defaults; nothing here fails.
//! - Without `DMLKIT_DB_PATH` the run uses a throwaway in-memory database.

use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "DMLKIT_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "DMLKIT_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "DMLKIT_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// SQLite file to run against; `None` means in-memory.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// File logging is enabled only when set.
    pub log_dir: Option<String>,
}

impl CliConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            db_path: read(DB_PATH_VAR).map(PathBuf::from),
            log_level: read(LOG_LEVEL_VAR)
                .unwrap_or_else(|| dmlkit_core::default_log_level().to_string()),
            log_dir: read(LOG_DIR_VAR),
        }
    }
}
