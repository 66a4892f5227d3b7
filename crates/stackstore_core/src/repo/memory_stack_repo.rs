//! In-process stack repository.
//!
//! Holds stacks in an id-ordered map behind one `RwLock`. Every write runs its
//! uniqueness checks and mutation under the write lock, so check-and-insert is
//! atomic. Search walks the map in id order and applies the pure predicates
//! from `search::filter`.

use crate::model::stack::{validate_stack_id, Stack, StackId};
use crate::repo::stack_repo::{RepoError, RepoResult, StackRepository, UniqueField};
use crate::search::filter::StackSearchQuery;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Memory-backed stack repository. Contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryStackRepository {
    stacks: RwLock<BTreeMap<StackId, Stack>>,
}

impl MemoryStackRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored stacks.
    pub fn len(&self) -> RepoResult<usize> {
        Ok(self.read()?.len())
    }

    fn read(&self) -> RepoResult<RwLockReadGuard<'_, BTreeMap<StackId, Stack>>> {
        self.stacks.read().map_err(|_| RepoError::LockPoisoned)
    }

    fn write(&self) -> RepoResult<RwLockWriteGuard<'_, BTreeMap<StackId, Stack>>> {
        self.stacks.write().map_err(|_| RepoError::LockPoisoned)
    }
}

impl StackRepository for MemoryStackRepository {
    fn get_by_id(&self, id: &str) -> RepoResult<Stack> {
        validate_stack_id(id)?;
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    fn create(&self, stack: &Stack) -> RepoResult<()> {
        stack.validate()?;

        let mut stacks = self.write()?;
        if stacks.contains_key(&stack.id) {
            return Err(RepoError::already_exists(UniqueField::Id, &stack.id));
        }
        if stacks.values().any(|stored| stored.name == stack.name) {
            return Err(RepoError::already_exists(UniqueField::Name, &stack.name));
        }

        stacks.insert(stack.id.clone(), stack.clone());
        Ok(())
    }

    fn update(&self, stack: &Stack) -> RepoResult<()> {
        stack.validate()?;

        let mut stacks = self.write()?;
        if !stacks.contains_key(&stack.id) {
            return Err(RepoError::NotFound(stack.id.clone()));
        }
        if stacks
            .values()
            .any(|stored| stored.id != stack.id && stored.name == stack.name)
        {
            return Err(RepoError::already_exists(UniqueField::Name, &stack.name));
        }

        stacks.insert(stack.id.clone(), stack.clone());
        Ok(())
    }

    fn remove(&self, id: &str) -> RepoResult<()> {
        validate_stack_id(id)?;
        self.write()?.remove(id);
        Ok(())
    }

    fn search_stacks(&self, query: &StackSearchQuery) -> RepoResult<Vec<Stack>> {
        let stacks = self.read()?;
        let page = query.paginate(stacks.values().filter(|stack| query.matches(stack)));
        Ok(page.into_iter().cloned().collect())
    }
}
