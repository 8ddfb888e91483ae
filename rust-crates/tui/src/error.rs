use crate::{
    account::Account,
    action::ActionKind,
};
use thiserror::Error;

pub const WALLET_UNAVAILABLE: &str = "Please install a wallet to use this application.";
pub const NO_ACCOUNT_AUTHORIZED: &str = "No accounts found. Please connect your wallet.";
pub const ACCOUNT_ACCESS_FAILED: &str = "Error accessing accounts. Please try again.";
pub const FETCH_STATE_FAILED: &str = "Error fetching contract data.";
pub const BIND_FAILED: &str = "Unable to use this account for the lottery.";

/// Everything the session can report. Only `WalletUnavailable` escapes the
/// session; the rest end up as a status message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("{}", WALLET_UNAVAILABLE)]
    WalletUnavailable,

    #[error("{}", NO_ACCOUNT_AUTHORIZED)]
    NoAccountAuthorized,

    #[error("{}", FETCH_STATE_FAILED)]
    ReadFailure(#[source] ReadFailure),

    #[error("{message}")]
    SubmissionRejected {
        kind: ActionKind,
        message: &'static str,
        #[source]
        failure: SubmissionFailure,
    },

    #[error("contract handle bound to {bound} used on behalf of {requested}")]
    StaleHandleUse { bound: Account, requested: Account },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("wallet refused account access: {0}")]
    AccessDenied(String),

    #[error("wallet access failed: {0}")]
    Access(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot bind lottery contract for {account}: {reason}")]
pub struct BindError {
    pub account: Account,
    pub reason: String,
}

/// One of the three snapshot queries failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{query} failed: {reason}")]
pub struct ReadFailure {
    pub query: &'static str,
    pub reason: String,
}

impl ReadFailure {
    pub fn new(query: &'static str, reason: impl Into<String>) -> Self {
        Self {
            query,
            reason: reason.into(),
        }
    }
}

/// Raw failure handed back by the submission channel, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct SubmissionFailure {
    pub code: Option<String>,
    pub reason: String,
}

impl SubmissionFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            code: None,
            reason: reason.into(),
        }
    }

    pub fn with_code(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            reason: reason.into(),
        }
    }
}
