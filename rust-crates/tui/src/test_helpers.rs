//! In-memory stand-ins for the wallet and the lottery contract.
//!
//! The ledger is a small lottery of its own: it records entrants, lets the
//! manager pick a winner and reset, and rejects calls with the same reasons
//! the deployed contract reverts with. Reads and confirmations can be held
//! back to exercise interleavings.

use crate::{
    account::Account,
    action::ActionRequest,
    binding::LotteryBinder,
    contract::{
        Inclusion,
        LotteryContract,
        PendingSubmission,
    },
    error::{
        BindError,
        ReadFailure,
        SubmissionFailure,
        WalletError,
    },
    identity::{
        AccountNotifier,
        AccountSubscription,
        WalletBridge,
    },
};
use std::{
    cell::RefCell,
    collections::HashSet,
    rc::Rc,
};
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedgerQuery {
    IsComplete,
    Winner,
    Manager,
}

#[derive(Debug)]
struct LedgerState {
    completed: bool,
    winner: Option<Account>,
    manager: Account,
    entrants: Vec<Account>,
    claimed: bool,
    failing_query: Option<LedgerQuery>,
    held_reads: HashSet<Account>,
    reads: Vec<(Account, LedgerQuery)>,
    submissions: Vec<(Account, ActionRequest)>,
    refuse_next_submit: Option<SubmissionFailure>,
}

#[derive(Clone, Debug)]
pub struct FakeLedger {
    state: Rc<RefCell<LedgerState>>,
    read_gate: Rc<watch::Sender<bool>>,
    confirm_gate: Rc<watch::Sender<bool>>,
}

async fn pass(gate: &watch::Sender<bool>) {
    let mut rx = gate.subscribe();
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}

impl FakeLedger {
    pub fn new(manager: Account) -> Self {
        let (read_gate, _) = watch::channel(true);
        let (confirm_gate, _) = watch::channel(true);
        Self {
            state: Rc::new(RefCell::new(LedgerState {
                completed: false,
                winner: None,
                manager,
                entrants: Vec::new(),
                claimed: false,
                failing_query: None,
                held_reads: HashSet::new(),
                reads: Vec::new(),
                submissions: Vec::new(),
                refuse_next_submit: None,
            })),
            read_gate: Rc::new(read_gate),
            confirm_gate: Rc::new(confirm_gate),
        }
    }

    pub fn binder(&self) -> FakeBinder {
        FakeBinder {
            ledger: self.clone(),
            refused: Rc::new(RefCell::new(HashSet::new())),
            binds: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn contract_for(&self, account: Account) -> FakeContract {
        FakeContract {
            account,
            ledger: self.clone(),
        }
    }

    pub fn set_round(&self, completed: bool, winner: Option<Account>) {
        let mut state = self.state.borrow_mut();
        state.completed = completed;
        state.winner = winner;
    }

    pub fn fail_reads(&self, query: Option<LedgerQuery>) {
        self.state.borrow_mut().failing_query = query;
    }

    /// Reads issued by `account` stall until [`FakeLedger::release_reads`].
    pub fn hold_reads_for(&self, account: Account) {
        self.state.borrow_mut().held_reads.insert(account);
        self.read_gate.send_replace(false);
    }

    pub fn release_reads(&self) {
        self.state.borrow_mut().held_reads.clear();
        self.read_gate.send_replace(true);
    }

    /// Submitted calls stay unconfirmed until [`FakeLedger::release_confirmations`].
    pub fn hold_confirmations(&self) {
        self.confirm_gate.send_replace(false);
    }

    pub fn release_confirmations(&self) {
        self.confirm_gate.send_replace(true);
    }

    pub fn refuse_next_submit(&self, failure: SubmissionFailure) {
        self.state.borrow_mut().refuse_next_submit = Some(failure);
    }

    pub fn reads(&self) -> Vec<(Account, LedgerQuery)> {
        self.state.borrow().reads.clone()
    }

    pub fn submissions(&self) -> Vec<(Account, ActionRequest)> {
        self.state.borrow().submissions.clone()
    }

    pub fn entrants(&self) -> Vec<Account> {
        self.state.borrow().entrants.clone()
    }

    pub fn completed(&self) -> bool {
        self.state.borrow().completed
    }

    async fn read(&self, account: &Account, query: LedgerQuery) -> Result<(), ReadFailure> {
        let held = {
            let mut state = self.state.borrow_mut();
            state.reads.push((account.clone(), query));
            state.held_reads.contains(account)
        };
        if held {
            pass(&self.read_gate).await;
        }
        if self.state.borrow().failing_query == Some(query) {
            return Err(ReadFailure::new(query_name(query), "node unavailable"));
        }
        Ok(())
    }

    fn apply(&self, caller: &Account, request: ActionRequest) -> Result<(), SubmissionFailure> {
        let mut state = self.state.borrow_mut();
        match request {
            ActionRequest::Enter { .. } => {
                if state.completed {
                    return Err(SubmissionFailure::new("Lottery has already ended"));
                }
                state.entrants.push(caller.clone());
            }
            ActionRequest::PickWinner => {
                if !state.manager.matches(caller) {
                    return Err(SubmissionFailure::new("Only the manager can pick a winner"));
                }
                if state.completed {
                    return Err(SubmissionFailure::new("Winner has already been picked"));
                }
                let Some(winner) = state.entrants.first().cloned() else {
                    return Err(SubmissionFailure::new("No players have entered"));
                };
                state.completed = true;
                state.winner = Some(winner);
            }
            ActionRequest::ClaimPrize => {
                if !state.completed {
                    return Err(SubmissionFailure::new("Lottery has not ended yet"));
                }
                if !state.winner.as_ref().is_some_and(|w| w.matches(caller)) {
                    return Err(SubmissionFailure::new("You are not the winner"));
                }
                if state.claimed {
                    return Err(SubmissionFailure::new("Prize has already been claimed"));
                }
                state.claimed = true;
            }
            ActionRequest::Reset => {
                if !state.manager.matches(caller) {
                    return Err(SubmissionFailure::new("Only the manager can reset"));
                }
                state.completed = false;
                state.winner = None;
                state.claimed = false;
                state.entrants.clear();
            }
        }
        Ok(())
    }
}

fn query_name(query: LedgerQuery) -> &'static str {
    match query {
        LedgerQuery::IsComplete => "is_complete",
        LedgerQuery::Winner => "get_winner",
        LedgerQuery::Manager => "get_manager",
    }
}

#[derive(Clone, Debug)]
pub struct FakeContract {
    account: Account,
    ledger: FakeLedger,
}

pub struct FakeSubmission {
    caller: Account,
    request: ActionRequest,
    ledger: FakeLedger,
}

impl PendingSubmission for FakeSubmission {
    async fn wait(self) -> Result<Inclusion, SubmissionFailure> {
        pass(&self.ledger.confirm_gate).await;
        self.ledger.apply(&self.caller, self.request)?;
        let count = self.ledger.state.borrow().submissions.len();
        Ok(Inclusion {
            tx_id: Some(format!("0x{count:064x}")),
        })
    }
}

impl LotteryContract for FakeContract {
    type Pending = FakeSubmission;

    fn account(&self) -> &Account {
        &self.account
    }

    async fn is_complete(&self) -> Result<bool, ReadFailure> {
        self.ledger
            .read(&self.account, LedgerQuery::IsComplete)
            .await?;
        Ok(self.ledger.state.borrow().completed)
    }

    async fn winner(&self) -> Result<Option<Account>, ReadFailure> {
        self.ledger.read(&self.account, LedgerQuery::Winner).await?;
        Ok(self.ledger.state.borrow().winner.clone())
    }

    async fn manager(&self) -> Result<Account, ReadFailure> {
        self.ledger.read(&self.account, LedgerQuery::Manager).await?;
        Ok(self.ledger.state.borrow().manager.clone())
    }

    async fn submit(&self, request: ActionRequest) -> Result<FakeSubmission, SubmissionFailure> {
        let mut state = self.ledger.state.borrow_mut();
        if let Some(failure) = state.refuse_next_submit.take() {
            return Err(failure);
        }
        state.submissions.push((self.account.clone(), request));
        Ok(FakeSubmission {
            caller: self.account.clone(),
            request,
            ledger: self.ledger.clone(),
        })
    }
}

#[derive(Clone, Debug)]
pub struct FakeBinder {
    ledger: FakeLedger,
    refused: Rc<RefCell<HashSet<Account>>>,
    binds: Rc<RefCell<Vec<Account>>>,
}

impl FakeBinder {
    pub fn refuse(&self, account: Account) {
        self.refused.borrow_mut().insert(account);
    }

    pub fn binds(&self) -> Vec<Account> {
        self.binds.borrow().clone()
    }
}

impl LotteryBinder for FakeBinder {
    type Contract = FakeContract;

    fn bind(&self, account: &Account) -> Result<FakeContract, BindError> {
        self.binds.borrow_mut().push(account.clone());
        if self.refused.borrow().contains(account) {
            return Err(BindError {
                account: account.clone(),
                reason: "no signer for account".to_string(),
            });
        }
        Ok(self.ledger.contract_for(account.clone()))
    }
}

#[derive(Debug)]
pub struct FakeWallet {
    accounts: Vec<Account>,
    refusal: Option<WalletError>,
    subscription: Option<AccountSubscription>,
}

impl FakeWallet {
    pub fn new(accounts: Vec<Account>) -> (Self, AccountNotifier) {
        let (notifier, subscription) = AccountSubscription::channel();
        let wallet = Self {
            accounts,
            refusal: None,
            subscription: Some(subscription),
        };
        (wallet, notifier)
    }

    pub fn refuse_access(&mut self, reason: &str) {
        self.refusal = Some(WalletError::AccessDenied(reason.to_string()));
    }
}

impl WalletBridge for FakeWallet {
    async fn request_accounts(&mut self) -> Result<Vec<Account>, WalletError> {
        match &self.refusal {
            Some(err) => Err(err.clone()),
            None => Ok(self.accounts.clone()),
        }
    }

    fn subscribe(&mut self) -> AccountSubscription {
        self.subscription
            .take()
            .unwrap_or_else(|| AccountSubscription::channel().1)
    }
}
