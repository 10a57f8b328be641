use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::limits::MIN_PASSWORD_LEN;
use crate::model::AccountId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    EmailTaken(String),
    InvalidCredentials,
    WeakPassword { min: usize },
    NotSignedIn(AccountId),
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityError::EmailTaken(email) => write!(f, "email already registered: {email}"),
            IdentityError::InvalidCredentials => write!(f, "invalid email or password"),
            IdentityError::WeakPassword { min } => {
                write!(f, "password must be at least {min} characters")
            }
            IdentityError::NotSignedIn(id) => write!(f, "account {id} is not signed in"),
        }
    }
}

impl std::error::Error for IdentityError {}

/// Issues stable account ids and checks credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AccountId, IdentityError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<AccountId, IdentityError>;
    async fn sign_out(&self, id: &AccountId) -> Result<(), IdentityError>;
}

struct Credential {
    id: AccountId,
    digest: [u8; 32],
}

/// Credentials held in memory, keyed by lower-cased e-mail.
#[derive(Default)]
pub struct InMemoryIdentity {
    credentials: DashMap<String, Credential>,
    signed_in: DashMap<AccountId, ()>,
}

impl InMemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_signed_in(&self, id: &AccountId) -> bool {
        self.signed_in.contains_key(id)
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// The account id salts the digest, so equal passwords hash differently.
fn digest(id: &AccountId, password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    write_framed(&mut hasher, id.as_str().as_bytes());
    write_framed(&mut hasher, password.as_bytes());
    hasher.finalize().into()
}

fn write_framed(hasher: &mut Sha256, bytes: &[u8]) {
    let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
    hasher.update(len.to_be_bytes());
    hasher.update(bytes);
}

#[async_trait]
impl IdentityProvider for InMemoryIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AccountId, IdentityError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword {
                min: MIN_PASSWORD_LEN,
            });
        }
        let key = email_key(email);
        match self.credentials.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(IdentityError::EmailTaken(email.trim().to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let id = AccountId::generate();
                slot.insert(Credential {
                    digest: digest(&id, password),
                    id: id.clone(),
                });
                self.signed_in.insert(id.clone(), ());
                Ok(id)
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AccountId, IdentityError> {
        let id = {
            let cred = self
                .credentials
                .get(&email_key(email))
                .ok_or(IdentityError::InvalidCredentials)?;
            if digest(&cred.id, password) != cred.digest {
                return Err(IdentityError::InvalidCredentials);
            }
            cred.id.clone()
        };
        self.signed_in.insert(id.clone(), ());
        Ok(id)
    }

    async fn sign_out(&self, id: &AccountId) -> Result<(), IdentityError> {
        self.signed_in
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| IdentityError::NotSignedIn(id.clone()))
    }
}
