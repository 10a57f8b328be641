use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::model::{Account, AccountId};

use super::{DocumentStore, PersistenceError};

/// Volatile store for tests and single-process use.
pub struct InMemoryStore {
    docs: DashMap<AccountId, Account>,
    writes: AtomicU64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            docs: DashMap::new(),
            writes: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Number of `put` calls served so far.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, id: &AccountId) -> Result<Option<Account>, PersistenceError> {
        Ok(self.docs.get(id).map(|e| e.value().clone()))
    }

    async fn put(&self, account: Account) -> Result<(), PersistenceError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.docs.insert(account.id.clone(), account);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Account>, PersistenceError> {
        let mut all: Vec<Account> = self.docs.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}
