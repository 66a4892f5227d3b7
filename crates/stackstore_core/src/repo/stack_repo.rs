//! Stack repository contract and error taxonomy.
//!
//! # Responsibility
//! - Define the storage-agnostic CRUD + search contract for stacks.
//! - Classify failures into argument, existence, conflict and storage errors.
//!
//! # Invariants
//! - Write paths must call `Stack::validate()` before touching storage.
//! - Id and name uniqueness checks run atomically with the write they guard.
//! - `remove` of a missing id succeeds; `get_by_id`/`update` report `NotFound`.
//! - Returned stacks are owned copies of stored state.

use crate::db::DbError;
use crate::model::stack::{Stack, StackId, StackValidationError};
use crate::search::filter::StackSearchQuery;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type RepoResult<T> = Result<T, RepoError>;

/// Stack attribute that must be unique across all stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Id,
    Name,
}

impl UniqueField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
        }
    }
}

/// Repository error for stack persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Required argument absent or entity invalid. Never worth retrying.
    InvalidArgument(StackValidationError),
    NotFound(StackId),
    /// Another stack already holds this id or name.
    AlreadyExists {
        field: UniqueField,
        value: String,
    },
    Db(DbError),
    LockPoisoned,
    InvalidData(String),
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl RepoError {
    pub(crate) fn already_exists(field: UniqueField, value: &str) -> Self {
        Self::AlreadyExists {
            field,
            value: value.to_string(),
        }
    }

    /// Returns whether the failure came from the storage layer rather than
    /// from the caller's input or the current stack state.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            Self::Db(_)
                | Self::LockPoisoned
                | Self::InvalidData(_)
                | Self::MissingRequiredTable(_)
                | Self::MissingRequiredColumn { .. }
        )
    }

    /// Stable short code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists { .. } => "already_exists",
            Self::Db(_) => "db_error",
            Self::LockPoisoned => "lock_poisoned",
            Self::InvalidData(_) => "invalid_data",
            Self::MissingRequiredTable(_) | Self::MissingRequiredColumn { .. } => "schema_missing",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(err) => write!(f, "invalid argument: {err}"),
            Self::NotFound(id) => write!(f, "stack not found: {id}"),
            Self::AlreadyExists { field, value } => {
                write!(f, "stack with {} `{value}` already exists", field.as_str())
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::LockPoisoned => write!(f, "stack storage lock poisoned"),
            Self::InvalidData(message) => write!(f, "invalid persisted stack data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "connection is missing required table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "table `{table}` is missing required column `{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArgument(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StackValidationError> for RepoError {
    fn from(value: StackValidationError) -> Self {
        Self::InvalidArgument(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for stack CRUD and ACL-filtered search.
pub trait StackRepository: Send + Sync {
    /// Loads one stack. Blank `id` is `InvalidArgument`, unknown is `NotFound`.
    fn get_by_id(&self, id: &str) -> RepoResult<Stack>;
    /// Stores a new stack; id and name must both be unused.
    fn create(&self, stack: &Stack) -> RepoResult<()>;
    /// Replaces every field of an existing stack.
    fn update(&self, stack: &Stack) -> RepoResult<()>;
    /// Deletes a stack. Unknown ids are a no-op.
    fn remove(&self, id: &str) -> RepoResult<()>;
    /// Returns visible stacks carrying all requested tags, ordered by id.
    fn search_stacks(&self, query: &StackSearchQuery) -> RepoResult<Vec<Stack>>;
}

impl<R: StackRepository + ?Sized> StackRepository for Arc<R> {
    fn get_by_id(&self, id: &str) -> RepoResult<Stack> {
        (**self).get_by_id(id)
    }

    fn create(&self, stack: &Stack) -> RepoResult<()> {
        (**self).create(stack)
    }

    fn update(&self, stack: &Stack) -> RepoResult<()> {
        (**self).update(stack)
    }

    fn remove(&self, id: &str) -> RepoResult<()> {
        (**self).remove(id)
    }

    fn search_stacks(&self, query: &StackSearchQuery) -> RepoResult<Vec<Stack>> {
        (**self).search_stacks(query)
    }
}
