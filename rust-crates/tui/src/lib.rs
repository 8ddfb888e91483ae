pub mod account;
pub mod action;
pub mod binding;
pub mod classify;
pub mod config;
pub mod contract;
pub mod error;
pub mod fuel;
pub mod identity;
pub mod session;
pub mod snapshot;
pub mod ui;
pub mod wallets;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use account::Account;
pub use action::{
    ActionKind,
    ActionRequest,
    Eligibility,
};
pub use error::SessionError;
pub use session::{
    LotterySession,
    SessionEvent,
    SessionView,
};
