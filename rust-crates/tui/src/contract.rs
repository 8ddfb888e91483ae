use crate::{
    account::Account,
    action::ActionRequest,
    error::{
        ReadFailure,
        SubmissionFailure,
    },
};
use std::future::Future;

/// Proof that a submitted call made it into a block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inclusion {
    pub tx_id: Option<String>,
}

/// A call that has been handed to the network but not yet included.
pub trait PendingSubmission {
    fn wait(self) -> impl Future<Output = Result<Inclusion, SubmissionFailure>>;
}

/// The lottery contract as seen through a handle bound to one account.
pub trait LotteryContract {
    type Pending: PendingSubmission;

    /// The account every call through this handle is signed by.
    fn account(&self) -> &Account;

    fn is_complete(&self) -> impl Future<Output = Result<bool, ReadFailure>>;

    /// `None` when the contract reports no winner.
    fn winner(&self) -> impl Future<Output = Result<Option<Account>, ReadFailure>>;

    fn manager(&self) -> impl Future<Output = Result<Account, ReadFailure>>;

    fn submit(
        &self,
        request: ActionRequest,
    ) -> impl Future<Output = Result<Self::Pending, SubmissionFailure>>;
}
