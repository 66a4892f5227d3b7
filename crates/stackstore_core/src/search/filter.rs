//! Visibility and tag predicates for stack search.
//!
//! # Responsibility
//! - Decide whether a caller may see a stack in search results.
//! - Decide whether a stack carries every requested tag.
//!
//! # Invariants
//! - Predicates are pure and storage-agnostic.
//! - SQL-backed search must select exactly the stacks these predicates accept.

use crate::model::stack::{Stack, SEARCH_ACTION};

/// Search options for ACL-filtered stack queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackSearchQuery {
    /// Caller identity. `None` restricts results to publicly searchable stacks.
    pub user_id: Option<String>,
    /// Required tags. Empty means no tag filter.
    pub tags: Vec<String>,
    /// Number of matches to skip.
    pub skip: u32,
    /// Maximum matches to return. `0` means no cap.
    pub limit: u32,
}

impl StackSearchQuery {
    /// Anonymous query without tag filter or pagination.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn page(mut self, skip: u32, limit: u32) -> Self {
        self.skip = skip;
        self.limit = limit;
        self
    }

    /// Returns whether `stack` passes visibility and tag filters.
    ///
    /// Pagination is not part of matching.
    pub fn matches(&self, stack: &Stack) -> bool {
        is_visible_to(stack, self.user_id.as_deref()) && has_all_tags(stack, &self.tags)
    }

    /// Applies `skip`/`limit` to an ordered stream of matches.
    pub fn paginate<T>(&self, matches: impl Iterator<Item = T>) -> Vec<T> {
        let skipped = matches.skip(self.skip as usize);
        if self.limit == 0 {
            skipped.collect()
        } else {
            skipped.take(self.limit as usize).collect()
        }
    }
}

/// Returns whether `user_id` may find `stack` through search.
///
/// Public `search` wins regardless of caller. Otherwise the caller needs an
/// ACL entry of their own that grants `search`.
pub fn is_visible_to(stack: &Stack, user_id: Option<&str>) -> bool {
    if stack.is_public(SEARCH_ACTION) {
        return true;
    }
    let Some(user_id) = user_id else {
        return false;
    };
    stack
        .acl
        .iter()
        .any(|entry| entry.user == user_id && entry.grants(SEARCH_ACTION))
}

/// Returns whether the stack's tags contain every requested tag.
pub fn has_all_tags(stack: &Stack, tags: &[String]) -> bool {
    tags.iter().all(|wanted| stack.tags.iter().any(|tag| tag == wanted))
}
