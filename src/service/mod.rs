//! The consultation service: lifecycle checks, derivation and collaborator
//! calls stitched into the operations clients actually invoke.

mod accounts;
mod error;
mod schedule;

pub use accounts::{NewAccount, Registration};
pub use error::ServiceError;

use std::sync::Arc;

use bytes::Bytes;

use crate::blob::BlobStore;
use crate::catalog::TimeGrid;
use crate::identity::IdentityProvider;
use crate::ingest::TableReader;
use crate::lifecycle::{DecisionPolicy, LifecycleState, Operation, StateViolation};
use crate::limits::{MAX_FILE_NAME_LEN, MAX_UPLOAD_BYTES};
use crate::model::Account;
use crate::notify::{AccountStateChanged, NotifyHub};
use crate::session::Session;
use crate::store::DocumentStore;

/// A file handed over by the client: the COR image or a timetable.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    fn validate(&self) -> Result<(), ServiceError> {
        if self.file_name.trim().is_empty() {
            return Err(ServiceError::Invalid("file name is required"));
        }
        if self.file_name.len() > MAX_FILE_NAME_LEN {
            return Err(ServiceError::LimitExceeded("file name too long"));
        }
        if self.bytes.is_empty() {
            return Err(ServiceError::Invalid("file is empty"));
        }
        if self.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(ServiceError::LimitExceeded("file too large"));
        }
        Ok(())
    }
}

/// External systems the service talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    /// Timetable formats accepted for upload, keyed by file extension.
    pub tables: TableReader,
}

pub struct Consultation {
    grid: Arc<TimeGrid>,
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    tables: Arc<TableReader>,
    notify: Arc<NotifyHub>,
    policy: DecisionPolicy,
}

impl Consultation {
    pub fn new(grid: TimeGrid, collaborators: Collaborators, notify: Arc<NotifyHub>) -> Self {
        Self {
            grid: Arc::new(grid),
            identity: collaborators.identity,
            store: collaborators.store,
            blobs: collaborators.blobs,
            tables: Arc::new(collaborators.tables),
            notify,
            policy: DecisionPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DecisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn notify(&self) -> &Arc<NotifyHub> {
        &self.notify
    }

    pub fn policy(&self) -> DecisionPolicy {
        self.policy
    }

    /// Re-read the acting account and check it may perform `operation`.
    ///
    /// The session's cached state is not trusted: an admin decision may have
    /// landed since it was built.
    async fn authorize(&self, session: &Session, operation: Operation) -> Result<Account, ServiceError> {
        let Some(id) = session.account_id() else {
            return Err(self.refuse(LifecycleState::Unauthenticated, operation));
        };
        let actor = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.clone()))?;
        let state = LifecycleState::of(&actor);
        if !state.permits(operation) {
            return Err(self.refuse(state, operation));
        }
        Ok(actor)
    }

    fn refuse(&self, state: LifecycleState, operation: Operation) -> ServiceError {
        metrics::counter!(
            crate::observability::STATE_VIOLATIONS_TOTAL,
            "operation" => operation.as_str(),
            "state" => state.label()
        )
        .increment(1);
        tracing::debug!(state = state.label(), operation = operation.as_str(), "refused");
        StateViolation::NotPermitted { state, operation }.into()
    }

    /// Persist, then announce. Nothing is announced if the write fails.
    async fn commit(&self, account: Account) -> Result<Account, ServiceError> {
        self.store.put(account.clone()).await?;
        let event = AccountStateChanged::committed(&account);
        metrics::counter!(
            crate::observability::STATE_TRANSITIONS_TOTAL,
            "to" => event.state.label()
        )
        .increment(1);
        self.notify.send(event);
        Ok(account)
    }
}

fn record<T>(operation: &'static str, result: &Result<T, ServiceError>) {
    metrics::counter!(
        crate::observability::OPERATIONS_TOTAL,
        "operation" => operation,
        "status" => crate::observability::status_label(result)
    )
    .increment(1);
    if let Err(e) = result {
        tracing::debug!(operation, kind = e.kind(), "operation failed: {e}");
    }
}
