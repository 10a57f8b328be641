//! Client-side view of "who is signed in and where should they be".

use crate::lifecycle::{LifecycleState, Screen};
use crate::model::{Account, AccountId};
use crate::notify::AccountStateChanged;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    account: Option<Account>,
    state: LifecycleState,
}

impl Default for Session {
    fn default() -> Self {
        Self::anonymous()
    }
}

impl Session {
    pub fn anonymous() -> Self {
        Self {
            account: None,
            state: LifecycleState::Unauthenticated,
        }
    }

    pub fn from_account(account: Account) -> Self {
        Self {
            state: LifecycleState::of(&account),
            account: Some(account),
        }
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub fn account_id(&self) -> Option<&AccountId> {
        self.account.as_ref().map(|a| &a.id)
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn screen(&self) -> Screen {
        self.state.screen()
    }

    /// Fold a committed change into this session. Changes for other accounts
    /// are ignored.
    pub fn apply(&mut self, event: &AccountStateChanged) {
        if self.account_id() != Some(&event.account_id) {
            return;
        }
        match &event.account {
            Some(account) => {
                self.account = Some(account.clone());
                self.state = event.state;
            }
            None => self.clear(),
        }
    }

    pub fn clear(&mut self) {
        self.account = None;
        self.state = LifecycleState::Unauthenticated;
    }
}
