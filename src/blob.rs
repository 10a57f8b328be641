use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::store::PersistenceError;

/// Opaque binary storage. Returns a URL the client can dereference later.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, path: &str, bytes: Bytes) -> Result<String, PersistenceError>;
}

/// Writes blobs under a root directory and hands out `file://` URLs.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a `/`-separated logical path to a location under the root.
    /// Each segment keeps only `[A-Za-z0-9_.-]`; `.`/`..` and empty segments
    /// are dropped.
    fn resolve(&self, path: &str) -> Result<PathBuf, PersistenceError> {
        let mut out = self.root.clone();
        let mut depth = 0;
        for segment in path.split('/') {
            let safe: String = segment
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
                .collect();
            if safe.is_empty() || safe.chars().all(|c| c == '.') {
                continue;
            }
            out.push(safe);
            depth += 1;
        }
        if depth == 0 {
            return Err(PersistenceError(format!("invalid blob path: {path:?}")));
        }
        Ok(out)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, path: &str, bytes: Bytes) -> Result<String, PersistenceError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &bytes).await?;
        let absolute = tokio::fs::canonicalize(&target).await?;
        tracing::debug!(path = %absolute.display(), len = bytes.len(), "blob written");
        Ok(format!("file://{}", absolute.display()))
    }
}
