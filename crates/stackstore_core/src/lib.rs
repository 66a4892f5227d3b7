//! Core domain logic for stack storage.
//! This crate is the single source of truth for stack invariants:
//! id/name uniqueness, whole-entity updates and ACL-filtered search.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use config::StoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::stack::{
    generate_stack_id, validate_stack_id, AclEntry, Stack, StackComponent, StackIcon, StackId,
    StackSource, StackValidationError, WorkspaceConfig, SEARCH_ACTION,
};
pub use repo::memory_stack_repo::MemoryStackRepository;
pub use repo::sqlite_stack_repo::SqliteStackRepository;
pub use repo::stack_repo::{RepoError, RepoResult, StackRepository, UniqueField};
pub use search::filter::{has_all_tags, is_visible_to, StackSearchQuery};
pub use service::stack_service::StackService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
