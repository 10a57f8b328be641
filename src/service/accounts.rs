use tracing::info;

use crate::lifecycle::{self, Decision, LifecycleState, Operation, Outcome};
use crate::limits::{MAX_EMAIL_LEN, MAX_NAME_LEN, MAX_STUDENT_ID_LEN, MAX_SUBJECTS};
use crate::model::{Account, AccountId, ApprovalStatus, Role};
use crate::notify::AccountStateChanged;
use crate::session::Session;

use super::{record, Consultation, FileUpload, ServiceError};

/// What a prospective student submits.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub student_id: String,
    /// Certificate of Registration image.
    pub cor: FileUpload,
}

/// An operator-provisioned teacher or admin.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub role: Role,
    pub name: String,
    pub email: String,
    pub password: String,
    pub subjects: Vec<String>,
}

fn required(value: &str, what: &'static str, max: usize, too_long: &'static str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::Invalid(what));
    }
    if value.len() > max {
        return Err(ServiceError::LimitExceeded(too_long));
    }
    Ok(())
}

impl Registration {
    fn validate(&self) -> Result<(), ServiceError> {
        required(&self.name, "name is required", MAX_NAME_LEN, "name too long")?;
        required(&self.email, "email is required", MAX_EMAIL_LEN, "email too long")?;
        required(
            &self.student_id,
            "student id is required",
            MAX_STUDENT_ID_LEN,
            "student id too long",
        )?;
        if self.password.is_empty() {
            return Err(ServiceError::Invalid("password is required"));
        }
        self.cor.validate()
    }
}

impl NewAccount {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.role == Role::Student {
            return Err(ServiceError::Invalid("students register themselves"));
        }
        required(&self.name, "name is required", MAX_NAME_LEN, "name too long")?;
        required(&self.email, "email is required", MAX_EMAIL_LEN, "email too long")?;
        if self.subjects.len() > MAX_SUBJECTS {
            return Err(ServiceError::LimitExceeded("too many subjects"));
        }
        Ok(())
    }
}

impl Consultation {
    /// Sign up a student, store their COR and create the pending account.
    pub async fn register_student(&self, registration: Registration) -> Result<Session, ServiceError> {
        let result = self.register_student_inner(registration).await;
        record("register_student", &result);
        result
    }

    async fn register_student_inner(&self, registration: Registration) -> Result<Session, ServiceError> {
        registration.validate()?;
        lifecycle::register(LifecycleState::Unauthenticated)?;

        let Registration {
            name,
            email,
            password,
            student_id,
            cor,
        } = registration;

        let id = self.identity.sign_up(email.trim(), &password).await?;
        let cor_url = self
            .blobs
            .put(&format!("cor/{id}/{}", cor.file_name), cor.bytes)
            .await?;

        let account = Account::student(id, name, email.trim().to_string(), student_id, cor_url);
        let account = self.commit(account).await?;
        info!(account = %account.id, "student registered, pending approval");
        Ok(Session::from_account(account))
    }

    /// Create a teacher or admin account. Both start approved.
    pub async fn provision_account(&self, new: NewAccount) -> Result<Account, ServiceError> {
        let result = self.provision_account_inner(new).await;
        record("provision_account", &result);
        result
    }

    async fn provision_account_inner(&self, new: NewAccount) -> Result<Account, ServiceError> {
        new.validate()?;
        let id = self.identity.sign_up(new.email.trim(), &new.password).await?;
        // Provisioning doesn't leave the new account signed in.
        self.identity.sign_out(&id).await?;

        let subjects = new
            .subjects
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let account = Account::provisioned(id, new.role, new.name, new.email.trim().to_string(), subjects);
        let account = self.commit(account).await?;
        info!(account = %account.id, role = %account.role, "account provisioned");
        Ok(account)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
        let result: Result<Session, ServiceError> = async {
            let id = self.identity.sign_in(email, password).await?;
            self.session_for(&id).await
        }
        .await;
        record("sign_in", &result);
        result
    }

    /// Rebuild a session from the stored account, e.g. after a restart.
    pub async fn session_for(&self, id: &AccountId) -> Result<Session, ServiceError> {
        let account = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(id.clone()))?;
        Ok(Session::from_account(account))
    }

    /// Allowed from every authenticated state, including pending and rejected.
    pub async fn sign_out(&self, session: &mut Session) -> Result<(), ServiceError> {
        let result = self.sign_out_inner(session).await;
        record("sign_out", &result);
        result
    }

    async fn sign_out_inner(&self, session: &mut Session) -> Result<(), ServiceError> {
        let (Ok(_), Some(id)) = (lifecycle::sign_out(session.state()), session.account_id().cloned()) else {
            return Err(self.refuse(session.state(), Operation::SignOut));
        };
        self.identity.sign_out(&id).await?;
        self.notify.send(AccountStateChanged::signed_out(id.clone()));
        session.clear();
        info!(account = %id, "signed out");
        Ok(())
    }

    pub async fn approve_student(&self, session: &Session, student: &AccountId) -> Result<Outcome, ServiceError> {
        let result = self.decide(session, student, Decision::Approve).await;
        record("approve_student", &result);
        result
    }

    pub async fn reject_student(&self, session: &Session, student: &AccountId) -> Result<Outcome, ServiceError> {
        let result = self.decide(session, student, Decision::Reject).await;
        record("reject_student", &result);
        result
    }

    async fn decide(&self, session: &Session, student: &AccountId, decision: Decision) -> Result<Outcome, ServiceError> {
        let admin = self.authorize(session, Operation::DecideRegistration).await?;
        let mut target = self
            .store
            .get(student)
            .await?
            .ok_or_else(|| ServiceError::NotFound(student.clone()))?;

        let outcome = lifecycle::decide(&mut target, decision, self.policy)?;
        if outcome == Outcome::Changed {
            let target = self.commit(target).await?;
            info!(admin = %admin.id, student = %target.id, status = %target.status, "registration decided");
        }
        Ok(outcome)
    }

    /// Students still waiting on a decision, ordered by id.
    pub async fn pending_students(&self, session: &Session) -> Result<Vec<Account>, ServiceError> {
        let result: Result<Vec<Account>, ServiceError> = async {
            self.authorize(session, Operation::ListPendingStudents).await?;
            let all = self.store.list().await?;
            Ok(all
                .into_iter()
                .filter(|a| a.role == Role::Student && a.status == ApprovalStatus::Pending)
                .collect())
        }
        .await;
        record("pending_students", &result);
        result
    }

    /// Every teacher account, ordered by id.
    pub async fn teachers(&self, session: &Session) -> Result<Vec<Account>, ServiceError> {
        let result: Result<Vec<Account>, ServiceError> = async {
            self.authorize(session, Operation::ManageTeachers).await?;
            let all = self.store.list().await?;
            Ok(all.into_iter().filter(|a| a.role == Role::Teacher).collect())
        }
        .await;
        record("teachers", &result);
        result
    }
}
