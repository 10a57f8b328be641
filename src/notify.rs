use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::lifecycle::LifecycleState;
use crate::model::{Account, AccountId};

const CHANNEL_CAPACITY: usize = 256;

/// Emitted after a write to an account has been committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountStateChanged {
    pub account_id: AccountId,
    pub state: LifecycleState,
    /// The committed document. `None` for sign-out.
    pub account: Option<Account>,
}

impl AccountStateChanged {
    pub fn committed(account: &Account) -> Self {
        Self {
            account_id: account.id.clone(),
            state: LifecycleState::of(account),
            account: Some(account.clone()),
        }
    }

    pub fn signed_out(account_id: AccountId) -> Self {
        Self {
            account_id,
            state: LifecycleState::Unauthenticated,
            account: None,
        }
    }
}

/// Broadcast hub for account state changes, one channel per account.
pub struct NotifyHub {
    channels: DashMap<AccountId, broadcast::Sender<AccountStateChanged>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to changes for an account. Creates the channel if needed.
    pub fn subscribe(&self, account_id: &AccountId) -> broadcast::Receiver<AccountStateChanged> {
        let sender = self
            .channels
            .entry(account_id.clone())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening.
    pub fn send(&self, event: AccountStateChanged) {
        if let Some(sender) = self.channels.get(&event.account_id) {
            let _ = sender.send(event);
        }
    }

    /// Drop channels whose last receiver has gone away.
    pub fn prune(&self) {
        self.channels.retain(|_, sender| sender.receiver_count() > 0);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApprovalStatus, Role};

    fn teacher() -> Account {
        Account::provisioned(
            AccountId::new("t1"),
            Role::Teacher,
            "T".into(),
            "t@uni.edu".into(),
            vec![],
        )
    }

    #[tokio::test]
    async fn subscribe_and_receive() {
        let hub = NotifyHub::new();
        let acct = teacher();
        let mut rx = hub.subscribe(&acct.id);

        hub.send(AccountStateChanged::committed(&acct));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.account_id, acct.id);
        assert_eq!(received.state, LifecycleState::Teacher(ApprovalStatus::Approved));
        assert_eq!(received.account, Some(acct));
    }

    #[tokio::test]
    async fn channels_are_per_account() {
        let hub = NotifyHub::new();
        let mut other = hub.subscribe(&AccountId::new("other"));
        hub.send(AccountStateChanged::signed_out(AccountId::new("t1")));
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn send_without_subscribers_is_noop() {
        let hub = NotifyHub::new();
        hub.send(AccountStateChanged::signed_out(AccountId::new("t1")));
        assert_eq!(hub.channel_count(), 0);
    }

    #[test]
    fn prune_drops_abandoned_channels() {
        let hub = NotifyHub::new();
        let rx = hub.subscribe(&AccountId::new("a"));
        let _keep = hub.subscribe(&AccountId::new("b"));
        drop(rx);
        hub.prune();
        assert_eq!(hub.channel_count(), 1);
    }
}
