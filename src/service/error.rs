use crate::identity::IdentityError;
use crate::lifecycle::StateViolation;
use crate::model::AccountId;
use crate::schedule::ParseError;
use crate::store::PersistenceError;

#[derive(Debug)]
pub enum ServiceError {
    Parse(ParseError),
    Persistence(PersistenceError),
    StateViolation(StateViolation),
    Identity(IdentityError),
    NotFound(AccountId),
    LimitExceeded(&'static str),
    Invalid(&'static str),
    /// The blocking derivation task panicked or was cancelled.
    TaskFailed(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Parse(e) => write!(f, "{e}"),
            ServiceError::Persistence(e) => write!(f, "{e}"),
            ServiceError::StateViolation(e) => write!(f, "{e}"),
            ServiceError::Identity(e) => write!(f, "{e}"),
            ServiceError::NotFound(id) => write!(f, "account not found: {id}"),
            ServiceError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            ServiceError::Invalid(msg) => write!(f, "invalid input: {msg}"),
            ServiceError::TaskFailed(e) => write!(f, "derivation task failed: {e}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Parse(e) => Some(e),
            ServiceError::Persistence(e) => Some(e),
            ServiceError::StateViolation(e) => Some(e),
            ServiceError::Identity(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for ServiceError {
    fn from(e: ParseError) -> Self {
        ServiceError::Parse(e)
    }
}

impl From<PersistenceError> for ServiceError {
    fn from(e: PersistenceError) -> Self {
        ServiceError::Persistence(e)
    }
}

impl From<StateViolation> for ServiceError {
    fn from(e: StateViolation) -> Self {
        ServiceError::StateViolation(e)
    }
}

impl From<IdentityError> for ServiceError {
    fn from(e: IdentityError) -> Self {
        ServiceError::Identity(e)
    }
}

impl ServiceError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Parse(_) => "parse",
            ServiceError::Persistence(_) => "persistence",
            ServiceError::StateViolation(_) => "state_violation",
            ServiceError::Identity(_) => "identity",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::LimitExceeded(_) => "limit_exceeded",
            ServiceError::Invalid(_) => "invalid",
            ServiceError::TaskFailed(_) => "task_failed",
        }
    }
}
