use crate::{
    account::Account,
    contract::LotteryContract,
    error::ReadFailure,
};

/// Point-in-time view of the remote lottery.
///
/// `completed` gates everything about the winner: while the round is open the
/// winner is reported as absent even if the contract still remembers one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LotteryState {
    completed: bool,
    winner: Option<Account>,
    manager: Account,
}

impl LotteryState {
    pub fn new(completed: bool, winner: Option<Account>, manager: Account) -> Self {
        Self {
            completed,
            winner,
            manager,
        }
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn winner(&self) -> Option<&Account> {
        if self.completed {
            self.winner.as_ref()
        } else {
            None
        }
    }

    pub fn manager(&self) -> &Account {
        &self.manager
    }

    pub fn is_winner(&self, account: Option<&Account>) -> bool {
        match (self.winner(), account) {
            (Some(winner), Some(account)) => winner.matches(account),
            _ => false,
        }
    }

    pub fn is_manager(&self, account: Option<&Account>) -> bool {
        account.is_some_and(|account| self.manager.matches(account))
    }

    /// Local view right after a confirmed reset, before the next read lands.
    pub fn reset_round(&mut self) {
        self.completed = false;
        self.winner = None;
    }
}

/// Issue the three queries and assemble a snapshot; any failure discards the
/// whole thing.
pub async fn read_snapshot<C: LotteryContract>(
    contract: &C,
) -> Result<LotteryState, ReadFailure> {
    let (completed, winner, manager) = futures::try_join!(
        contract.is_complete(),
        contract.winner(),
        contract.manager(),
    )?;
    Ok(LotteryState::new(completed, winner, manager))
}
