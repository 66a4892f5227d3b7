//! Stack domain model.
//!
//! # Responsibility
//! - Define the canonical stack record shared by every repository backend.
//!
//! # Invariants
//! - Every stack is identified by a caller-supplied, non-blank `StackId`.
//! - Values handed out by repositories are owned copies, never shared state.

pub mod stack;
