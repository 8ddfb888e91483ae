//! The owned session: identity, contract binding, lottery snapshot and the
//! single in-flight action, advanced one event at a time.

use crate::{
    account::Account,
    action::{
        ActionKind,
        ActionRequest,
        Eligibility,
    },
    binding::{
        ContractBinding,
        Generation,
        LotteryBinder,
    },
    classify::classify,
    contract::{
        Inclusion,
        LotteryContract,
        PendingSubmission,
    },
    error::{
        ACCOUNT_ACCESS_FAILED,
        BIND_FAILED,
        FETCH_STATE_FAILED,
        NO_ACCOUNT_AUTHORIZED,
        ReadFailure,
        SessionError,
        SubmissionFailure,
    },
    identity::{
        AccessOutcome,
        IdentityChange,
        IdentityTracker,
        WalletBridge,
    },
    snapshot::{
        LotteryState,
        read_snapshot,
    },
};
use futures::{
    FutureExt,
    StreamExt,
    future::LocalBoxFuture,
    stream::FuturesUnordered,
};
use tracing::{
    debug,
    error,
    info,
    warn,
};

pub const NOT_THE_WINNER: &str = "You are not the winner.";
pub const NOT_THE_OWNER: &str = "You are not the owner.";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UiStatus {
    pub busy: bool,
    pub message: Option<String>,
}

/// The action currently occupying the submission slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionTicket {
    pub kind: ActionKind,
    pub account: Account,
    pub generation: Generation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ReadTicket {
    generation: Generation,
    seq: u64,
}

enum Completion {
    Snapshot {
        ticket: ReadTicket,
        result: Result<LotteryState, ReadFailure>,
    },
    Action {
        ticket: ActionTicket,
        result: Result<Inclusion, SubmissionFailure>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    Busy,
    NotEligible,
    NoHandle,
    StaleHandle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invocation {
    Submitted(ActionKind),
    Ignored(IgnoreReason),
}

/// One state transition, as produced by [`LotterySession::next_event`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    AccountChanged(IdentityChange),
    SnapshotApplied,
    SnapshotDiscarded,
    SnapshotFailed(SessionError),
    ActionConfirmed { kind: ActionKind, inclusion: Inclusion },
    ActionRejected(SessionError),
}

/// Everything the UI reads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionView {
    pub account: Option<Account>,
    pub busy: bool,
    pub message: Option<String>,
    pub lottery: Option<LotteryState>,
    pub is_winner: bool,
    pub is_manager: bool,
    pub eligibility: Eligibility,
}

impl SessionView {
    pub fn completed(&self) -> bool {
        self.lottery.as_ref().is_some_and(LotteryState::completed)
    }

    pub fn winner(&self) -> Option<&Account> {
        self.lottery.as_ref().and_then(LotteryState::winner)
    }

    pub fn manager(&self) -> Option<&Account> {
        self.lottery.as_ref().map(LotteryState::manager)
    }

    /// Shown on the home panel in place of the claim action.
    pub fn home_notice(&self) -> Option<&'static str> {
        (self.completed() && !self.is_winner).then_some(NOT_THE_WINNER)
    }

    /// Text for the winner panel. `None` while loading, or when the manager
    /// should be offered the pick winner action instead.
    pub fn result_notice(&self) -> Option<String> {
        let lottery = self.lottery.as_ref()?;
        if lottery.completed() {
            let winner = lottery
                .winner()
                .map(Account::to_string)
                .unwrap_or_else(|| "-".to_string());
            return Some(format!("Lottery Winner is: {winner}"));
        }
        (!self.is_manager).then(|| NOT_THE_OWNER.to_string())
    }
}

pub struct LotterySession<W, B: LotteryBinder> {
    identity: IdentityTracker<W>,
    binder: B,
    binding: ContractBinding<B::Contract>,
    lottery: Option<LotteryState>,
    status: UiStatus,
    in_flight: Option<ActionTicket>,
    latest_read: u64,
    pending: FuturesUnordered<LocalBoxFuture<'static, Completion>>,
}

impl<W, B> LotterySession<W, B>
where
    W: WalletBridge,
    B: LotteryBinder,
{
    /// Connect to the wallet and bind the first authorized account.
    ///
    /// Fails only when there is no wallet at all; in that case nothing else is
    /// attempted and `make_binder` is never called.
    pub async fn start<F>(wallet: Option<W>, make_binder: F) -> Result<Self, SessionError>
    where
        F: FnOnce(&W) -> B,
    {
        let (identity, outcome) = IdentityTracker::connect(wallet).await?;
        let binder = make_binder(identity.wallet());
        let mut session = Self {
            identity,
            binder,
            binding: ContractBinding::default(),
            lottery: None,
            status: UiStatus::default(),
            in_flight: None,
            latest_read: 0,
            pending: FuturesUnordered::new(),
        };
        match outcome {
            AccessOutcome::Connected(account) => {
                info!(%account, "wallet connected");
                session.rebind();
            }
            AccessOutcome::NoAccount => {
                info!("wallet authorized no accounts");
                session.status.message = Some(NO_ACCOUNT_AUTHORIZED.to_string());
            }
            AccessOutcome::Failed(_) => {
                session.status.message = Some(ACCOUNT_ACCESS_FAILED.to_string());
            }
        }
        Ok(session)
    }

    pub fn account(&self) -> Option<&Account> {
        self.identity.current()
    }

    pub fn status(&self) -> &UiStatus {
        &self.status
    }

    pub fn lottery(&self) -> Option<&LotteryState> {
        self.lottery.as_ref()
    }

    pub fn in_flight(&self) -> Option<&ActionTicket> {
        self.in_flight.as_ref()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Nothing is offered unless the current account holds a live handle.
    pub fn eligibility(&self) -> Eligibility {
        let account = self.identity.current();
        let bound = account
            .is_some_and(|account| matches!(self.binding.handle_for(account), Ok(Some(_))));
        if !bound {
            return Eligibility::default();
        }
        Eligibility::evaluate(self.lottery.as_ref(), account, self.status.busy)
    }

    pub fn view(&self) -> SessionView {
        let account = self.identity.current();
        let (is_winner, is_manager) = match &self.lottery {
            Some(lottery) => (lottery.is_winner(account), lottery.is_manager(account)),
            None => (false, false),
        };
        SessionView {
            account: account.cloned(),
            busy: self.status.busy,
            message: self.status.message.clone(),
            lottery: self.lottery.clone(),
            is_winner,
            is_manager,
            eligibility: self.eligibility(),
        }
    }

    /// Start `kind` if the slot is free and the current account may run it.
    pub fn invoke(&mut self, kind: ActionKind) -> Invocation {
        if self.status.busy {
            debug!(%kind, "ignored while another action is in flight");
            return Invocation::Ignored(IgnoreReason::Busy);
        }
        if !self.eligibility().allows(kind) {
            debug!(%kind, "ignored; not eligible");
            return Invocation::Ignored(IgnoreReason::NotEligible);
        }
        let Some(account) = self.identity.current() else {
            return Invocation::Ignored(IgnoreReason::NoHandle);
        };
        let bound = match self.binding.handle_for(account) {
            Ok(Some(bound)) => bound,
            Ok(None) => return Invocation::Ignored(IgnoreReason::NoHandle),
            Err(err) => {
                error!(error = %err, "refusing to submit through a stale handle");
                return Invocation::Ignored(IgnoreReason::StaleHandle);
            }
        };
        let ticket = ActionTicket {
            kind,
            account: account.clone(),
            generation: bound.generation,
        };
        let contract = bound.contract.clone();
        let request = ActionRequest::for_kind(kind);
        info!(%kind, account = %ticket.account, "submitting");

        self.status.busy = true;
        self.status.message = None;
        self.in_flight = Some(ticket.clone());
        self.pending.push(
            async move {
                let result = match contract.submit(request).await {
                    Ok(pending) => pending.wait().await,
                    Err(failure) => Err(failure),
                };
                Completion::Action { ticket, result }
            }
            .boxed_local(),
        );
        Invocation::Submitted(kind)
    }

    /// Wait for the next completion or account notification and apply it.
    ///
    /// Completions are preferred over notifications. Returns `None` once there
    /// is nothing left that could produce an event.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        let completion = tokio::select! {
            biased;
            Some(completion) = self.pending.next(), if !self.pending.is_empty() => completion,
            Some(accounts) = self.identity.next_notification(), if self.identity.is_subscribed() => {
                return Some(self.on_accounts_changed(accounts));
            }
            else => return None,
        };
        Some(self.complete(completion))
    }

    /// Drive outstanding reads and submissions to completion, ignoring
    /// account notifications.
    pub async fn settle(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(completion) = self.pending.next().await {
            events.push(self.complete(completion));
        }
        events
    }

    /// Apply a fresh account list from the wallet.
    pub fn on_accounts_changed(&mut self, accounts: Vec<Account>) -> SessionEvent {
        let change = self.identity.apply(accounts);
        match &change {
            IdentityChange::Unchanged => {}
            IdentityChange::Connected(account) => info!(%account, "account connected"),
            IdentityChange::Switched { from, to } => info!(%from, %to, "account switched"),
            IdentityChange::Disconnected(account) => info!(%account, "account disconnected"),
        }
        if change.rebind_needed() {
            self.rebind();
        }
        SessionEvent::AccountChanged(change)
    }

    /// Tear down the account subscription. Outstanding work still resolves.
    pub fn close(&mut self) {
        self.identity.unsubscribe();
    }

    fn rebind(&mut self) {
        let account = self.identity.current().cloned();
        match self.binding.rebind(&self.binder, account.as_ref()) {
            Ok(Some(generation)) => {
                debug!(?generation, "contract bound");
                if !self.status.busy {
                    self.status.message = None;
                }
                self.refresh();
            }
            Ok(None) => {
                self.status.message = Some(NO_ACCOUNT_AUTHORIZED.to_string());
            }
            Err(err) => {
                warn!(error = %err, "binding failed");
                self.status.message = Some(BIND_FAILED.to_string());
            }
        }
    }

    /// Issue a snapshot read through the live handle.
    fn refresh(&mut self) {
        let Some(account) = self.identity.current() else {
            return;
        };
        let bound = match self.binding.handle_for(account) {
            Ok(Some(bound)) => bound,
            Ok(None) => return,
            Err(err) => {
                error!(error = %err, "refusing to read through a stale handle");
                return;
            }
        };
        self.latest_read += 1;
        let ticket = ReadTicket {
            generation: bound.generation,
            seq: self.latest_read,
        };
        let contract = bound.contract.clone();
        debug!(seq = ticket.seq, "reading lottery state");
        self.pending.push(
            async move {
                let result = read_snapshot(&contract).await;
                Completion::Snapshot { ticket, result }
            }
            .boxed_local(),
        );
    }

    fn complete(&mut self, completion: Completion) -> SessionEvent {
        match completion {
            Completion::Snapshot { ticket, result } => self.on_snapshot(ticket, result),
            Completion::Action { ticket, result } => self.on_action(ticket, result),
        }
    }

    fn on_snapshot(
        &mut self,
        ticket: ReadTicket,
        result: Result<LotteryState, ReadFailure>,
    ) -> SessionEvent {
        if !self.binding.is_current(ticket.generation) || ticket.seq != self.latest_read {
            warn!(seq = ticket.seq, latest = self.latest_read, "discarding stale snapshot");
            return SessionEvent::SnapshotDiscarded;
        }
        match result {
            Ok(state) => {
                debug!(completed = state.completed(), "lottery state applied");
                self.lottery = Some(state);
                SessionEvent::SnapshotApplied
            }
            Err(failure) => {
                warn!(error = %failure, "lottery state unavailable");
                self.lottery = None;
                self.status.message = Some(FETCH_STATE_FAILED.to_string());
                SessionEvent::SnapshotFailed(SessionError::ReadFailure(failure))
            }
        }
    }

    fn on_action(
        &mut self,
        ticket: ActionTicket,
        result: Result<Inclusion, SubmissionFailure>,
    ) -> SessionEvent {
        if self.in_flight.as_ref() != Some(&ticket) {
            error!(kind = %ticket.kind, "completion for an action that does not hold the slot");
        }
        self.in_flight = None;
        self.status.busy = false;
        let kind = ticket.kind;
        match result {
            Ok(inclusion) => {
                info!(%kind, tx_id = ?inclusion.tx_id, "confirmed");
                self.status.message = Some(kind.success_message().to_string());
                if kind == ActionKind::Reset {
                    if let Some(lottery) = self.lottery.as_mut() {
                        lottery.reset_round();
                    }
                }
                if kind.mutates_lottery() {
                    self.refresh();
                }
                SessionEvent::ActionConfirmed { kind, inclusion }
            }
            Err(failure) => {
                let message = classify(kind, &failure);
                error!(%kind, reason = %failure, shown = message, "rejected");
                self.status.message = Some(message.to_string());
                SessionEvent::ActionRejected(SessionError::SubmissionRejected {
                    kind,
                    message,
                    failure,
                })
            }
        }
    }
}
