//! Account lifecycle: which role/status combinations may do what.
//!
//! ```text
//! Unauthenticated ──register──▶ Student(Pending) ──approve──▶ Student(Approved)
//!                                       └────────reject───▶ Student(Rejected)
//! any authenticated state ──sign out──▶ Unauthenticated
//! ```
//!
//! Teachers and admins are provisioned outside this machine. Decisions are
//! one-way: nothing returns to `Pending`.

use std::str::FromStr;

use crate::model::{Account, AccountId, ApprovalStatus, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Unauthenticated,
    Student(ApprovalStatus),
    /// Only `Teacher(Approved)` is reachable through normal provisioning.
    Teacher(ApprovalStatus),
    Admin,
}

/// Operations gated by lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Register,
    SignOut,
    /// A teacher replacing their own availability.
    UploadAvailability,
    /// An admin replacing an approved teacher's availability.
    UploadAvailabilityForTeacher,
    ViewAvailability,
    DecideRegistration,
    ListPendingStudents,
    ManageTeachers,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Register => "register",
            Operation::SignOut => "sign_out",
            Operation::UploadAvailability => "upload_availability",
            Operation::UploadAvailabilityForTeacher => "upload_availability_for_teacher",
            Operation::ViewAvailability => "view_availability",
            Operation::DecideRegistration => "decide_registration",
            Operation::ListPendingStudents => "list_pending_students",
            Operation::ManageTeachers => "manage_teachers",
        }
    }
}

/// Where the client should route an account in a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Login,
    PendingApproval,
    Rejected,
    StudentHome,
    TeacherHome,
    AdminHome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateViolation {
    NotPermitted {
        state: LifecycleState,
        operation: Operation,
    },
    AlreadyDecided {
        account: AccountId,
        status: ApprovalStatus,
    },
    NotAStudent(AccountId),
    NotAnApprovedTeacher(AccountId),
}

impl std::fmt::Display for StateViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateViolation::NotPermitted { state, operation } => {
                write!(f, "{} not permitted in state {state:?}", operation.as_str())
            }
            StateViolation::AlreadyDecided { account, status } => {
                write!(f, "registration of {account} already {status}")
            }
            StateViolation::NotAStudent(id) => write!(f, "account {id} is not a student"),
            StateViolation::NotAnApprovedTeacher(id) => {
                write!(f, "account {id} is not an approved teacher")
            }
        }
    }
}

impl std::error::Error for StateViolation {}

impl LifecycleState {
    /// Project a stored account onto the machine. Admins are always approved.
    pub fn of(account: &Account) -> Self {
        match account.role {
            Role::Student => LifecycleState::Student(account.status),
            Role::Teacher => LifecycleState::Teacher(account.status),
            Role::Admin => LifecycleState::Admin,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !matches!(self, LifecycleState::Unauthenticated)
    }

    pub fn permits(&self, operation: Operation) -> bool {
        use ApprovalStatus::Approved;
        use LifecycleState::*;

        match operation {
            Operation::Register => matches!(self, Unauthenticated),
            Operation::SignOut => self.is_authenticated(),
            Operation::UploadAvailability => matches!(self, Teacher(Approved)),
            Operation::ViewAvailability => {
                matches!(self, Student(Approved) | Teacher(Approved) | Admin)
            }
            Operation::UploadAvailabilityForTeacher
            | Operation::DecideRegistration
            | Operation::ListPendingStudents
            | Operation::ManageTeachers => matches!(self, Admin),
        }
    }

    pub fn require(&self, operation: Operation) -> Result<(), StateViolation> {
        if self.permits(operation) {
            Ok(())
        } else {
            Err(StateViolation::NotPermitted {
                state: *self,
                operation,
            })
        }
    }

    pub fn screen(&self) -> Screen {
        match self {
            LifecycleState::Unauthenticated => Screen::Login,
            LifecycleState::Student(ApprovalStatus::Pending)
            | LifecycleState::Teacher(ApprovalStatus::Pending) => Screen::PendingApproval,
            LifecycleState::Student(ApprovalStatus::Rejected)
            | LifecycleState::Teacher(ApprovalStatus::Rejected) => Screen::Rejected,
            LifecycleState::Student(ApprovalStatus::Approved) => Screen::StudentHome,
            LifecycleState::Teacher(ApprovalStatus::Approved) => Screen::TeacherHome,
            LifecycleState::Admin => Screen::AdminHome,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LifecycleState::Unauthenticated => "unauthenticated",
            LifecycleState::Student(ApprovalStatus::Pending) => "student_pending",
            LifecycleState::Student(ApprovalStatus::Approved) => "student_approved",
            LifecycleState::Student(ApprovalStatus::Rejected) => "student_rejected",
            LifecycleState::Teacher(ApprovalStatus::Pending) => "teacher_pending",
            LifecycleState::Teacher(ApprovalStatus::Approved) => "teacher_approved",
            LifecycleState::Teacher(ApprovalStatus::Rejected) => "teacher_rejected",
            LifecycleState::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target(self) -> ApprovalStatus {
        match self {
            Decision::Approve => ApprovalStatus::Approved,
            Decision::Reject => ApprovalStatus::Rejected,
        }
    }
}

/// How to treat a decision on a student that is no longer pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecisionPolicy {
    /// Any second decision is a `StateViolation`.
    #[default]
    Strict,
    /// Repeating the recorded decision is a no-op; the opposite one still fails.
    Idempotent,
}

impl FromStr for DecisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(DecisionPolicy::Strict),
            "idempotent" => Ok(DecisionPolicy::Idempotent),
            other => Err(format!("unknown decision policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Changed,
    Unchanged,
}

/// Apply an admin decision to a student account in place.
pub fn decide(
    account: &mut Account,
    decision: Decision,
    policy: DecisionPolicy,
) -> Result<Outcome, StateViolation> {
    if account.role != Role::Student {
        return Err(StateViolation::NotAStudent(account.id.clone()));
    }
    match (account.status, policy) {
        (ApprovalStatus::Pending, _) => {
            account.status = decision.target();
            Ok(Outcome::Changed)
        }
        (current, DecisionPolicy::Idempotent) if current == decision.target() => {
            Ok(Outcome::Unchanged)
        }
        (current, _) => Err(StateViolation::AlreadyDecided {
            account: account.id.clone(),
            status: current,
        }),
    }
}

/// Registration is only possible while signed out.
pub fn register(state: LifecycleState) -> Result<LifecycleState, StateViolation> {
    state.require(Operation::Register)?;
    Ok(LifecycleState::Student(ApprovalStatus::Pending))
}

/// Sign-out is unconditional for any authenticated state.
pub fn sign_out(state: LifecycleState) -> Result<LifecycleState, StateViolation> {
    state.require(Operation::SignOut)?;
    Ok(LifecycleState::Unauthenticated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApprovalStatus::*;

    fn student(status: ApprovalStatus) -> Account {
        let mut acct = Account::student(
            AccountId::new("s1"),
            "Sam".into(),
            "sam@uni.edu".into(),
            "2024-001".into(),
            "file:///cor.png".into(),
        );
        acct.status = status;
        acct
    }

    fn teacher(status: ApprovalStatus) -> Account {
        let mut acct = Account::provisioned(
            AccountId::new("t1"),
            Role::Teacher,
            "Tess".into(),
            "tess@uni.edu".into(),
            vec![],
        );
        acct.status = status;
        acct
    }

    #[test]
    fn approve_pending_student() {
        let mut acct = student(Pending);
        let outcome = decide(&mut acct, Decision::Approve, DecisionPolicy::Strict).unwrap();
        assert_eq!(outcome, Outcome::Changed);
        assert_eq!(acct.status, Approved);
        assert_eq!(LifecycleState::of(&acct), LifecycleState::Student(Approved));
    }

    #[test]
    fn reject_pending_student() {
        let mut acct = student(Pending);
        decide(&mut acct, Decision::Reject, DecisionPolicy::Strict).unwrap();
        assert_eq!(acct.status, Rejected);
        assert_eq!(LifecycleState::of(&acct).screen(), Screen::Rejected);
    }

    #[test]
    fn strict_policy_rejects_second_decision() {
        let mut acct = student(Approved);
        for decision in [Decision::Approve, Decision::Reject] {
            let err = decide(&mut acct, decision, DecisionPolicy::Strict).unwrap_err();
            assert_eq!(
                err,
                StateViolation::AlreadyDecided {
                    account: AccountId::new("s1"),
                    status: Approved,
                }
            );
        }
        assert_eq!(acct.status, Approved);
    }

    #[test]
    fn idempotent_policy_allows_repeat_only() {
        let mut acct = student(Approved);
        let outcome = decide(&mut acct, Decision::Approve, DecisionPolicy::Idempotent).unwrap();
        assert_eq!(outcome, Outcome::Unchanged);
        let err = decide(&mut acct, Decision::Reject, DecisionPolicy::Idempotent).unwrap_err();
        assert!(matches!(err, StateViolation::AlreadyDecided { .. }));
        assert_eq!(acct.status, Approved);
    }

    #[test]
    fn rejected_never_returns_to_pending() {
        let mut acct = student(Rejected);
        assert!(decide(&mut acct, Decision::Approve, DecisionPolicy::Strict).is_err());
        assert!(decide(&mut acct, Decision::Approve, DecisionPolicy::Idempotent).is_err());
        assert_eq!(acct.status, Rejected);
    }

    #[test]
    fn only_students_can_be_decided() {
        let mut acct = teacher(Pending);
        let err = decide(&mut acct, Decision::Approve, DecisionPolicy::Strict).unwrap_err();
        assert_eq!(err, StateViolation::NotAStudent(AccountId::new("t1")));
    }

    #[test]
    fn upload_only_for_approved_teacher() {
        let states = [
            LifecycleState::Unauthenticated,
            LifecycleState::Student(Pending),
            LifecycleState::Student(Approved),
            LifecycleState::Student(Rejected),
            LifecycleState::Teacher(Pending),
            LifecycleState::Teacher(Rejected),
            LifecycleState::Admin,
        ];
        for state in states {
            assert!(
                state.require(Operation::UploadAvailability).is_err(),
                "{state:?} must not upload"
            );
        }
        assert!(LifecycleState::Teacher(Approved)
            .require(Operation::UploadAvailability)
            .is_ok());
    }

    #[test]
    fn admin_only_operations() {
        for op in [
            Operation::DecideRegistration,
            Operation::ListPendingStudents,
            Operation::ManageTeachers,
            Operation::UploadAvailabilityForTeacher,
        ] {
            assert!(LifecycleState::Admin.permits(op));
            assert!(!LifecycleState::Teacher(Approved).permits(op));
            assert!(!LifecycleState::Student(Approved).permits(op));
        }
    }

    #[test]
    fn pending_student_cannot_view_availability() {
        assert!(!LifecycleState::Student(Pending).permits(Operation::ViewAvailability));
        assert!(LifecycleState::Student(Approved).permits(Operation::ViewAvailability));
    }

    #[test]
    fn register_only_when_signed_out() {
        assert_eq!(
            register(LifecycleState::Unauthenticated),
            Ok(LifecycleState::Student(Pending))
        );
        assert!(register(LifecycleState::Admin).is_err());
    }

    #[test]
    fn sign_out_from_any_authenticated_state() {
        for state in [
            LifecycleState::Student(Pending),
            LifecycleState::Student(Rejected),
            LifecycleState::Teacher(Approved),
            LifecycleState::Admin,
        ] {
            assert_eq!(sign_out(state), Ok(LifecycleState::Unauthenticated));
        }
        assert!(sign_out(LifecycleState::Unauthenticated).is_err());
    }

    #[test]
    fn screens() {
        assert_eq!(LifecycleState::Unauthenticated.screen(), Screen::Login);
        assert_eq!(LifecycleState::Student(Pending).screen(), Screen::PendingApproval);
        assert_eq!(LifecycleState::Student(Approved).screen(), Screen::StudentHome);
        assert_eq!(LifecycleState::Teacher(Approved).screen(), Screen::TeacherHome);
        assert_eq!(LifecycleState::of(&teacher(Pending)).screen(), Screen::PendingApproval);
        assert_eq!(LifecycleState::Admin.screen(), Screen::AdminHome);
    }

    #[test]
    fn policy_from_str() {
        assert_eq!("Strict".parse::<DecisionPolicy>(), Ok(DecisionPolicy::Strict));
        assert_eq!(" idempotent ".parse::<DecisionPolicy>(), Ok(DecisionPolicy::Idempotent));
        assert!("lenient".parse::<DecisionPolicy>().is_err());
    }
}
