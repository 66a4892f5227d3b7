//! Stack use-case service.
//!
//! # Responsibility
//! - Provide stable entry points for stack callers.
//! - Emit one metadata-only log line per operation.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/uniqueness contracts.
//! - Repository errors are returned unchanged.
//! - Stack payloads (tags, ACL, config) are never written to logs.

use crate::model::stack::Stack;
use crate::repo::stack_repo::{RepoResult, StackRepository};
use crate::search::filter::StackSearchQuery;
use log::{info, warn};
use std::time::Instant;

/// Use-case service wrapper for stack operations.
pub struct StackService<R: StackRepository> {
    repo: R,
}

impl<R: StackRepository> StackService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn get_stack(&self, id: &str) -> RepoResult<Stack> {
        let started_at = Instant::now();
        let result = self.repo.get_by_id(id);
        log_outcome("stack_get", id, started_at, &result);
        result
    }

    /// Stores a new stack.
    ///
    /// Returns `AlreadyExists` when either the id or the name is taken.
    pub fn create_stack(&self, stack: &Stack) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.repo.create(stack);
        log_outcome("stack_create", &stack.id, started_at, &result);
        result
    }

    /// Replaces an existing stack in full.
    pub fn update_stack(&self, stack: &Stack) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.repo.update(stack);
        log_outcome("stack_update", &stack.id, started_at, &result);
        result
    }

    /// Deletes a stack. Missing ids succeed silently.
    pub fn remove_stack(&self, id: &str) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.repo.remove(id);
        log_outcome("stack_remove", id, started_at, &result);
        result
    }

    /// Searches stacks visible to `user_id` that carry every tag in `tags`.
    ///
    /// `limit == 0` returns every match after `skip`.
    pub fn search_stacks(
        &self,
        user_id: Option<&str>,
        tags: &[String],
        skip: u32,
        limit: u32,
    ) -> RepoResult<Vec<Stack>> {
        let query = StackSearchQuery {
            user_id: user_id.map(str::to_string),
            tags: tags.to_vec(),
            skip,
            limit,
        };
        self.search(&query)
    }

    /// Query-object form of [`StackService::search_stacks`].
    pub fn search(&self, query: &StackSearchQuery) -> RepoResult<Vec<Stack>> {
        let started_at = Instant::now();
        let result = self.repo.search_stacks(query);
        match &result {
            Ok(stacks) => info!(
                "event=stack_search module=stack status=ok duration_ms={} anonymous={} tag_count={} skip={} limit={} hits={}",
                started_at.elapsed().as_millis(),
                query.user_id.is_none(),
                query.tags.len(),
                query.skip,
                query.limit,
                stacks.len()
            ),
            Err(err) => warn!(
                "event=stack_search module=stack status=error duration_ms={} error_code={} error={}",
                started_at.elapsed().as_millis(),
                err.code(),
                err
            ),
        }
        result
    }
}

fn log_outcome<T>(event: &str, stack_id: &str, started_at: Instant, result: &RepoResult<T>) {
    match result {
        Ok(_) => info!(
            "event={event} module=stack status=ok stack_id={stack_id} duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event={event} module=stack status=error stack_id={stack_id} duration_ms={} error_code={} error={}",
            started_at.elapsed().as_millis(),
            err.code(),
            err
        ),
    }
}
