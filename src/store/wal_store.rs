use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{info, warn};

use crate::model::{Account, AccountId};

use super::log::AccountLog;
use super::{DocumentStore, PersistenceError};

/// `None` until the first put for this id has been made durable.
pub type SharedAccount = Arc<RwLock<Option<Account>>>;

// ── Group-commit log channel ─────────────────────────────

type Ack = oneshot::Sender<io::Result<()>>;

enum LogCommand {
    Put { account: Account, response: Ack },
    Rewrite { accounts: Vec<Account>, response: Ack },
    Superseded { response: oneshot::Sender<u64> },
}

/// Owns the log. Puts that queue up while a sync is in flight share the next
/// one.
async fn log_writer_loop(mut log: AccountLog, mut rx: mpsc::Receiver<LogCommand>) {
    let mut next = rx.recv().await;
    while let Some(cmd) = next.take() {
        let (account, response) = match cmd {
            LogCommand::Put { account, response } => (account, response),
            LogCommand::Rewrite { accounts, response } => {
                let _ = response.send(log.rewrite(&accounts));
                next = rx.recv().await;
                continue;
            }
            LogCommand::Superseded { response } => {
                let _ = response.send(log.superseded());
                next = rx.recv().await;
                continue;
            }
        };

        let mut batch = vec![(account, response)];
        loop {
            match rx.try_recv() {
                Ok(LogCommand::Put { account, response }) => batch.push((account, response)),
                Ok(other) => {
                    next = Some(other);
                    break;
                }
                Err(_) => break,
            }
        }

        metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
        let start = std::time::Instant::now();
        let result = write_batch(&mut log, &batch);
        metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());

        for (_, ack) in batch {
            let _ = ack.send(match &result {
                Ok(()) => Ok(()),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            });
        }

        if next.is_none() {
            next = rx.recv().await;
        }
    }
}

/// Append every document, then sync once. The sync runs even after a failed
/// append so partial bytes don't ride along with the next batch.
fn write_batch(log: &mut AccountLog, batch: &[(Account, Ack)]) -> io::Result<()> {
    let appended = batch.iter().try_for_each(|(account, _)| log.append(account));
    let synced = log.sync();
    appended.and(synced)
}

/// Durable document store. Every `put` is synced to the log before it becomes
/// visible to readers.
pub struct WalStore {
    docs: DashMap<AccountId, SharedAccount>,
    log_tx: mpsc::Sender<LogCommand>,
    /// Puts hold this shared; compaction holds it exclusively so the snapshot
    /// it writes can't miss an acknowledged put.
    compaction: RwLock<()>,
    path: PathBuf,
}

impl WalStore {
    /// Recover the log at `path` (creating it if needed) and start the writer
    /// task. Must be called from within a tokio runtime.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let (log, recovered) = AccountLog::recover(&path)?;
        if recovered.discarded_bytes > 0 {
            warn!(
                path = %path.display(),
                discarded_bytes = recovered.discarded_bytes,
                "truncated torn or corrupt tail of account log"
            );
        }
        info!(
            path = %path.display(),
            frames = recovered.frames,
            accounts = recovered.accounts.len(),
            superseded = log.superseded(),
            "document store opened"
        );

        let (log_tx, log_rx) = mpsc::channel(4096);
        tokio::spawn(log_writer_loop(log, log_rx));

        let docs = recovered
            .accounts
            .into_iter()
            .map(|account| (account.id.clone(), Arc::new(RwLock::new(Some(account)))))
            .collect();

        Ok(Self {
            docs,
            log_tx,
            compaction: RwLock::new(()),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn send(&self, cmd: LogCommand) -> Result<(), PersistenceError> {
        self.log_tx
            .send(cmd)
            .await
            .map_err(|_| PersistenceError("log writer shut down".into()))
    }

    async fn acked(&self, cmd: LogCommand, rx: oneshot::Receiver<io::Result<()>>) -> Result<(), PersistenceError> {
        self.send(cmd).await?;
        rx.await
            .map_err(|_| PersistenceError("log writer dropped response".into()))?
            .map_err(PersistenceError::from)
    }

    /// Rewrite the log with exactly one frame per live document.
    pub async fn compact(&self) -> Result<(), PersistenceError> {
        let _exclusive = self.compaction.write().await;

        let accounts = self.list().await?;
        let (response, rx) = oneshot::channel();
        self.acked(LogCommand::Rewrite { accounts, response }, rx).await
    }

    /// Compact once at least `threshold` frames in the log have been
    /// superseded by later puts. Returns whether it compacted.
    pub async fn compact_if_due(&self, threshold: u64) -> Result<bool, PersistenceError> {
        let superseded = self.superseded_frames().await?;
        if superseded < threshold {
            return Ok(false);
        }
        self.compact().await?;
        info!(superseded, "compacted account log");
        Ok(true)
    }

    /// Frames in the log that a later put to the same account replaced. Counts
    /// across restarts.
    pub async fn superseded_frames(&self) -> Result<u64, PersistenceError> {
        let (response, rx) = oneshot::channel();
        self.send(LogCommand::Superseded { response }).await?;
        rx.await
            .map_err(|_| PersistenceError("log writer dropped response".into()))
    }
}

#[async_trait]
impl DocumentStore for WalStore {
    async fn get(&self, id: &AccountId) -> Result<Option<Account>, PersistenceError> {
        let Some(doc) = self.docs.get(id).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        let account = doc.read().await.clone();
        Ok(account)
    }

    async fn put(&self, account: Account) -> Result<(), PersistenceError> {
        let _shared = self.compaction.read().await;

        let doc = self
            .docs
            .entry(account.id.clone())
            .or_insert_with(|| Arc::new(RwLock::new(None)))
            .value()
            .clone();
        let mut guard = doc.write().await;
        let (response, rx) = oneshot::channel();
        self.acked(
            LogCommand::Put {
                account: account.clone(),
                response,
            },
            rx,
        )
        .await?;
        *guard = Some(account);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Account>, PersistenceError> {
        let shared: Vec<SharedAccount> = self.docs.iter().map(|e| e.value().clone()).collect();
        let mut all = Vec::with_capacity(shared.len());
        for doc in shared {
            if let Some(account) = doc.read().await.clone() {
                all.push(account);
            }
        }
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AvailabilitySlot, Role, Weekday};

    fn test_wal_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("consultgrid_test_store");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    fn teacher(id: &str) -> Account {
        Account::provisioned(
            AccountId::new(id),
            Role::Teacher,
            format!("Teacher {id}"),
            format!("{id}@uni.edu"),
            vec!["Math".into()],
        )
    }

    #[tokio::test]
    async fn put_survives_restart() {
        let path = test_wal_path("restart.wal");
        {
            let store = WalStore::open(&path).unwrap();
            store.put(teacher("t1")).await.unwrap();
            let mut updated = teacher("t1");
            updated.available_slots =
                vec![AvailabilitySlot::available(Weekday::Monday, "7:00-7:30".into())];
            store.put(updated).await.unwrap();
            store.put(teacher("t2")).await.unwrap();
        }

        let store = WalStore::open(&path).unwrap();
        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);
        let t1 = store.get(&AccountId::new("t1")).await.unwrap().unwrap();
        assert_eq!(t1.available_slots.len(), 1);
    }

    #[tokio::test]
    async fn compact_preserves_latest_documents() {
        let path = test_wal_path("compact.wal");
        {
            let store = WalStore::open(&path).unwrap();
            for i in 0..20 {
                let mut acct = teacher("t1");
                acct.name = format!("rev {i}");
                store.put(acct).await.unwrap();
            }
            assert_eq!(store.superseded_frames().await.unwrap(), 19);

            let before = std::fs::metadata(&path).unwrap().len();
            store.compact().await.unwrap();
            let after = std::fs::metadata(&path).unwrap().len();
            assert!(after < before, "compacted WAL ({after}) should be smaller than {before}");
            assert_eq!(store.superseded_frames().await.unwrap(), 0);

            store.put(teacher("t2")).await.unwrap();
        }

        let store = WalStore::open(&path).unwrap();
        let t1 = store.get(&AccountId::new("t1")).await.unwrap().unwrap();
        assert_eq!(t1.name, "rev 19");
        assert!(store.get(&AccountId::new("t2")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn compact_if_due_counts_superseded_frames_across_restarts() {
        let path = test_wal_path("compact_due.wal");
        {
            let store = WalStore::open(&path).unwrap();
            for _ in 0..3 {
                store.put(teacher("t1")).await.unwrap();
            }
            store.put(teacher("t2")).await.unwrap();
            assert!(!store.compact_if_due(5).await.unwrap());
        }

        let store = WalStore::open(&path).unwrap();
        assert_eq!(store.superseded_frames().await.unwrap(), 2);
        assert!(!store.compact_if_due(3).await.unwrap());
        assert!(store.compact_if_due(2).await.unwrap());
        assert_eq!(store.superseded_frames().await.unwrap(), 0);
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn torn_tail_does_not_block_later_puts() {
        let path = test_wal_path("torn.wal");
        {
            let store = WalStore::open(&path).unwrap();
            store.put(teacher("t1")).await.unwrap();
        }
        {
            use std::io::Write;
            let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[0xAB; 11]).unwrap();
        }
        {
            let store = WalStore::open(&path).unwrap();
            assert_eq!(store.list().await.unwrap().len(), 1);
            store.put(teacher("t2")).await.unwrap();
        }

        let store = WalStore::open(&path).unwrap();
        assert_eq!(store.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_puts_all_land() {
        let path = test_wal_path("concurrent.wal");
        let store = Arc::new(WalStore::open(&path).unwrap());

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.put(teacher(&format!("t{i:02}"))).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(store.list().await.unwrap().len(), 32);
        drop(store);

        let reopened = WalStore::open(&path).unwrap();
        assert_eq!(reopened.list().await.unwrap().len(), 32);
    }
}
