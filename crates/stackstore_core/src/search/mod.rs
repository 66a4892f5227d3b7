//! ACL-aware stack search.
//!
//! # Responsibility
//! - Define search query options shared by every repository backend.
//! - Expose visibility/tag predicates as pure functions.

pub mod filter;
