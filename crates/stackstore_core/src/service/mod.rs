//! Service layer for stack use-cases.
//!
//! # Responsibility
//! - Orchestrate repository calls behind caller-facing entry points.
//! - Keep operation logging out of storage implementations.

pub mod stack_service;
