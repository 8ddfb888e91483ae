use crate::{
    account::Account,
    error::{
        SessionError,
        WalletError,
    },
};
use std::future::Future;
use tokio::sync::mpsc;

/// The wallet collaborator: account authorization plus change notifications.
pub trait WalletBridge {
    /// Ask the wallet which accounts this client may use; the active one first.
    fn request_accounts(&mut self) -> impl Future<Output = Result<Vec<Account>, WalletError>>;

    /// Register for account-change notifications.
    fn subscribe(&mut self) -> AccountSubscription;
}

/// Sending half handed to the wallet side.
#[derive(Clone, Debug)]
pub struct AccountNotifier {
    tx: mpsc::UnboundedSender<Vec<Account>>,
}

impl AccountNotifier {
    /// Returns `false` once the subscriber has gone away.
    pub fn notify(&self, accounts: Vec<Account>) -> bool {
        self.tx.send(accounts).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half owned by the [`IdentityTracker`]. Dropping it, or calling
/// [`AccountSubscription::unsubscribe`], tears the subscription down.
#[derive(Debug)]
pub struct AccountSubscription {
    rx: mpsc::UnboundedReceiver<Vec<Account>>,
}

impl AccountSubscription {
    pub fn channel() -> (AccountNotifier, AccountSubscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        (AccountNotifier { tx }, AccountSubscription { rx })
    }

    pub async fn next(&mut self) -> Option<Vec<Account>> {
        self.rx.recv().await
    }

    pub fn unsubscribe(mut self) {
        self.rx.close();
    }
}

/// What the initial authorization request produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessOutcome {
    Connected(Account),
    NoAccount,
    Failed(WalletError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityChange {
    Connected(Account),
    Switched { from: Account, to: Account },
    Disconnected(Account),
    Unchanged,
}

impl IdentityChange {
    pub fn rebind_needed(&self) -> bool {
        !matches!(self, IdentityChange::Unchanged)
    }
}

/// Owns the single current account.
#[derive(Debug)]
pub struct IdentityTracker<W> {
    wallet: W,
    current: Option<Account>,
    subscription: Option<AccountSubscription>,
}

impl<W: WalletBridge> IdentityTracker<W> {
    /// Request account access and subscribe to changes.
    ///
    /// A missing wallet is fatal and nothing else is attempted.
    pub async fn connect(wallet: Option<W>) -> Result<(Self, AccessOutcome), SessionError> {
        let Some(mut wallet) = wallet else {
            tracing::error!("no wallet available; refusing to continue");
            return Err(SessionError::WalletUnavailable);
        };
        let outcome = match wallet.request_accounts().await {
            Ok(accounts) => match accounts.into_iter().next() {
                Some(account) => AccessOutcome::Connected(account),
                None => AccessOutcome::NoAccount,
            },
            Err(err) => {
                tracing::warn!(error = %err, "account access request failed");
                AccessOutcome::Failed(err)
            }
        };
        let subscription = wallet.subscribe();
        let current = match &outcome {
            AccessOutcome::Connected(account) => Some(account.clone()),
            _ => None,
        };
        let tracker = Self {
            wallet,
            current,
            subscription: Some(subscription),
        };
        Ok((tracker, outcome))
    }

    pub fn current(&self) -> Option<&Account> {
        self.current.as_ref()
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Wait for the next notification; `None` once the stream is torn down.
    pub async fn next_notification(&mut self) -> Option<Vec<Account>> {
        let subscription = self.subscription.as_mut()?;
        let accounts = subscription.next().await;
        if accounts.is_none() {
            tracing::info!("account change stream closed");
            self.subscription = None;
        }
        accounts
    }

    /// Replace the current account with the head of `accounts`.
    pub fn apply(&mut self, accounts: Vec<Account>) -> IdentityChange {
        let next = accounts.into_iter().next();
        let change = match (self.current.take(), next.clone()) {
            (None, None) => IdentityChange::Unchanged,
            (None, Some(to)) => IdentityChange::Connected(to),
            (Some(from), None) => IdentityChange::Disconnected(from),
            (Some(from), Some(to)) if from.matches(&to) => IdentityChange::Unchanged,
            (Some(from), Some(to)) => IdentityChange::Switched { from, to },
        };
        self.current = next;
        change
    }

    pub fn unsubscribe(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use crate::test_helpers::FakeWallet;

    #[tokio::test]
    async fn connect__without_a_wallet_is_fatal() {
        // when
        let result = IdentityTracker::<FakeWallet>::connect(None).await;

        // then
        assert_eq!(result.err(), Some(SessionError::WalletUnavailable));
    }

    #[tokio::test]
    async fn connect__takes_the_first_authorized_account() {
        // given
        let (wallet, _notifier) =
            FakeWallet::new(vec![Account::from("0xAAA"), Account::from("0xBBB")]);

        // when
        let (tracker, outcome) = IdentityTracker::connect(Some(wallet)).await.unwrap();

        // then
        assert_eq!(outcome, AccessOutcome::Connected(Account::from("0xAAA")));
        assert_eq!(tracker.current(), Some(&Account::from("0xAAA")));
        assert!(tracker.is_subscribed());
    }

    #[tokio::test]
    async fn connect__with_no_accounts_still_subscribes() {
        // given
        let (wallet, _notifier) = FakeWallet::new(Vec::new());

        // when
        let (tracker, outcome) = IdentityTracker::connect(Some(wallet)).await.unwrap();

        // then
        assert_eq!(outcome, AccessOutcome::NoAccount);
        assert_eq!(tracker.current(), None);
        assert!(tracker.is_subscribed());
    }

    #[tokio::test]
    async fn connect__reports_a_refused_request() {
        // given
        let (mut wallet, _notifier) = FakeWallet::new(vec![Account::from("0xAAA")]);
        wallet.refuse_access("user rejected the request");

        // when
        let (tracker, outcome) = IdentityTracker::connect(Some(wallet)).await.unwrap();

        // then
        assert!(matches!(outcome, AccessOutcome::Failed(_)));
        assert_eq!(tracker.current(), None);
    }

    #[tokio::test]
    async fn apply__classifies_each_transition() {
        // given
        let (wallet, _notifier) = FakeWallet::new(Vec::new());
        let (mut tracker, _) = IdentityTracker::connect(Some(wallet)).await.unwrap();

        // then
        assert_eq!(
            tracker.apply(vec![Account::from("0xAAA")]),
            IdentityChange::Connected(Account::from("0xAAA"))
        );
        assert_eq!(
            tracker.apply(vec![Account::from("0xaaa")]),
            IdentityChange::Unchanged
        );
        assert_eq!(
            tracker.apply(vec![Account::from("0xBBB"), Account::from("0xAAA")]),
            IdentityChange::Switched {
                from: Account::from("0xaaa"),
                to: Account::from("0xBBB"),
            }
        );
        assert_eq!(
            tracker.apply(Vec::new()),
            IdentityChange::Disconnected(Account::from("0xBBB"))
        );
        assert_eq!(tracker.apply(Vec::new()), IdentityChange::Unchanged);
        assert_eq!(tracker.current(), None);
    }

    #[tokio::test]
    async fn next_notification__delivers_in_order() {
        // given
        let (wallet, notifier) = FakeWallet::new(Vec::new());
        let (mut tracker, _) = IdentityTracker::connect(Some(wallet)).await.unwrap();
        notifier.notify(vec![Account::from("0x01")]);
        notifier.notify(vec![Account::from("0x02")]);

        // then
        assert_eq!(
            tracker.next_notification().await,
            Some(vec![Account::from("0x01")])
        );
        assert_eq!(
            tracker.next_notification().await,
            Some(vec![Account::from("0x02")])
        );
    }

    #[tokio::test]
    async fn unsubscribe__closes_the_notifier_side() {
        // given
        let (wallet, notifier) = FakeWallet::new(Vec::new());
        let (mut tracker, _) = IdentityTracker::connect(Some(wallet)).await.unwrap();

        // when
        tracker.unsubscribe();

        // then
        assert!(!tracker.is_subscribed());
        assert!(!notifier.notify(vec![Account::from("0x01")]));
        assert_eq!(tracker.next_notification().await, None);
    }

    #[tokio::test]
    async fn next_notification__ends_when_the_wallet_side_goes_away() {
        // given
        let (wallet, notifier) = FakeWallet::new(Vec::new());
        let (mut tracker, _) = IdentityTracker::connect(Some(wallet)).await.unwrap();
        notifier.notify(vec![Account::from("0x01")]);
        drop(notifier);

        // then
        assert!(tracker.next_notification().await.is_some());
        assert_eq!(tracker.next_notification().await, None);
        assert!(!tracker.is_subscribed());
    }
}
