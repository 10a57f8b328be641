//! Account document storage.
//!
//! The service only ever reads whole documents and writes whole documents;
//! there are no partial-field updates and no transactions across documents.

mod log;
mod memory;
mod wal_store;

pub use memory::InMemoryStore;
pub use wal_store::WalStore;

use async_trait::async_trait;

use crate::model::{Account, AccountId};

/// Opaque failure from the backing store. Surfaced to the caller, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceError(pub String);

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "persistence error: {}", self.0)
    }
}

impl std::error::Error for PersistenceError {}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        PersistenceError(e.to_string())
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, id: &AccountId) -> Result<Option<Account>, PersistenceError>;

    /// Replace (or create) the document. Last write wins.
    async fn put(&self, account: Account) -> Result<(), PersistenceError>;

    /// Every document, ordered by id.
    async fn list(&self) -> Result<Vec<Account>, PersistenceError>;
}
