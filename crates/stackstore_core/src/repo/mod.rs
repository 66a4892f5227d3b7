//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the stack data access contract shared by all backends.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Stack::validate()` before persistence.
//! - Repository APIs return semantic errors (`NotFound`, `AlreadyExists`)
//!   in addition to storage errors.

pub mod memory_stack_repo;
pub mod sqlite_stack_repo;
pub mod stack_repo;
