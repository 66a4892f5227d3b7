//! Process-level configuration for stack storage.
//!
//! # Responsibility
//! - Resolve database location and logging settings from the environment.
//! - Open a ready-to-use repository from that configuration.
//!
//! # Invariants
//! - Blank environment values count as unset.
//! - Without a database path the store runs fully in memory.

use crate::db::{open_db, open_db_in_memory};
use crate::logging::{default_log_level, init_logging, LoggingError};
use crate::repo::sqlite_stack_repo::SqliteStackRepository;
use crate::repo::stack_repo::RepoResult;
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "STACKSTORE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "STACKSTORE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "STACKSTORE_LOG_DIR";

/// Resolved store configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// SQLite file path. `None` selects an in-memory database.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Rolling log directory. `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl StoreConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps variable names to
    /// values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            db_path: read(ENV_DB_PATH).map(PathBuf::from),
            log_level: read(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
        }
    }

    /// Starts file logging when a log directory is configured.
    ///
    /// Returns `Ok(false)` when no directory is set.
    pub fn init_logging(&self) -> Result<bool, LoggingError> {
        let Some(log_dir) = self.log_dir.as_ref() else {
            return Ok(false);
        };
        init_logging(&self.log_level, &log_dir.to_string_lossy())?;
        Ok(true)
    }

    /// Opens the configured database and wraps it in a repository.
    pub fn open_repository(&self) -> RepoResult<SqliteStackRepository> {
        let conn = match self.db_path.as_ref() {
            Some(path) => open_db(path)?,
            None => open_db_in_memory()?,
        };
        SqliteStackRepository::try_new(conn)
    }
}
