use crate::{
    account::Account,
    snapshot::LotteryState,
};
use std::fmt;

/// 0.001 of the base asset (9 decimals).
pub const ENTRY_STAKE: u64 = 1_000_000;
pub const ENTRY_GAS_LIMIT: u64 = 300_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Enter,
    PickWinner,
    ClaimPrize,
    Reset,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Enter,
        ActionKind::PickWinner,
        ActionKind::ClaimPrize,
        ActionKind::Reset,
    ];

    pub fn success_message(self) -> &'static str {
        match self {
            ActionKind::Enter => "Successfully entered the lottery!",
            ActionKind::PickWinner => "Winner picked successfully!",
            ActionKind::ClaimPrize => "Prize claimed successfully!",
            ActionKind::Reset => "Lottery reset successfully!",
        }
    }

    /// Whether a confirmed call changes completion, winner or manager.
    pub fn mutates_lottery(self) -> bool {
        !matches!(self, ActionKind::ClaimPrize)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Enter => "enter",
            ActionKind::PickWinner => "pick winner",
            ActionKind::ClaimPrize => "claim prize",
            ActionKind::Reset => "reset",
        };
        f.write_str(name)
    }
}

/// A state-changing call with the minimal payload it needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionRequest {
    Enter { stake: u64, gas_limit: u64 },
    PickWinner,
    ClaimPrize,
    Reset,
}

impl ActionRequest {
    pub fn for_kind(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Enter => ActionRequest::Enter {
                stake: ENTRY_STAKE,
                gas_limit: ENTRY_GAS_LIMIT,
            },
            ActionKind::PickWinner => ActionRequest::PickWinner,
            ActionKind::ClaimPrize => ActionRequest::ClaimPrize,
            ActionKind::Reset => ActionRequest::Reset,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::Enter { .. } => ActionKind::Enter,
            ActionRequest::PickWinner => ActionKind::PickWinner,
            ActionRequest::ClaimPrize => ActionKind::ClaimPrize,
            ActionRequest::Reset => ActionKind::Reset,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Eligibility {
    pub enter: bool,
    pub pick_winner: bool,
    pub claim_prize: bool,
    pub reset: bool,
}

impl Eligibility {
    /// Which actions the connected account may invoke right now.
    ///
    /// Nothing is enabled without an account and a snapshot, or while another
    /// action is being submitted. Pick winner is gated on the manager role
    /// only; the contract decides whether the round can be closed.
    pub fn evaluate(
        lottery: Option<&LotteryState>,
        account: Option<&Account>,
        busy: bool,
    ) -> Self {
        let (Some(lottery), Some(_), false) = (lottery, account, busy) else {
            return Self::default();
        };
        let is_manager = lottery.is_manager(account);
        Self {
            enter: !lottery.completed(),
            pick_winner: is_manager,
            claim_prize: lottery.completed() && lottery.is_winner(account),
            reset: is_manager,
        }
    }

    pub fn allows(&self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::Enter => self.enter,
            ActionKind::PickWinner => self.pick_winner,
            ActionKind::ClaimPrize => self.claim_prize,
            ActionKind::Reset => self.reset,
        }
    }

    pub fn any(&self) -> bool {
        ActionKind::ALL.iter().any(|kind| self.allows(*kind))
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;

    fn lottery(completed: bool, winner: Option<&str>, manager: &str) -> LotteryState {
        LotteryState::new(completed, winner.map(Account::from), Account::from(manager))
    }

    #[test]
    fn evaluate__open_round_lets_anyone_enter() {
        // given
        let state = lottery(false, None, "0xMANAGER");
        let player = Account::from("0xBBB");

        // when
        let eligibility = Eligibility::evaluate(Some(&state), Some(&player), false);

        // then
        assert_eq!(
            eligibility,
            Eligibility {
                enter: true,
                pick_winner: false,
                claim_prize: false,
                reset: false,
            }
        );
    }

    #[test]
    fn evaluate__winner_can_claim_regardless_of_case() {
        // given
        let state = lottery(true, Some("0xAAA"), "0xMANAGER");
        let winner = Account::from("0xaaa");

        // when
        let eligibility = Eligibility::evaluate(Some(&state), Some(&winner), false);

        // then
        assert!(eligibility.claim_prize);
        assert!(!eligibility.enter);
    }

    #[test]
    fn evaluate__other_accounts_cannot_claim() {
        // given
        let state = lottery(true, Some("0xAAA"), "0xMANAGER");
        let other = Account::from("0xBBB");

        // when
        let eligibility = Eligibility::evaluate(Some(&state), Some(&other), false);

        // then
        assert!(!eligibility.claim_prize);
        assert!(!eligibility.any());
    }

    #[test]
    fn evaluate__manager_may_pick_and_reset_in_any_phase() {
        for completed in [false, true] {
            // given
            let state = lottery(completed, Some("0xAAA"), "0xMANAGER");
            let manager = Account::from("0xmanager");

            // when
            let eligibility = Eligibility::evaluate(Some(&state), Some(&manager), false);

            // then
            assert!(eligibility.pick_winner, "completed={completed}");
            assert!(eligibility.reset, "completed={completed}");
        }
    }

    #[test]
    fn evaluate__busy_disables_everything() {
        // given
        let state = lottery(false, None, "0xMANAGER");
        let manager = Account::from("0xMANAGER");

        // when
        let eligibility = Eligibility::evaluate(Some(&state), Some(&manager), true);

        // then
        assert_eq!(eligibility, Eligibility::default());
    }

    #[test]
    fn evaluate__nothing_without_snapshot_or_account() {
        let state = lottery(false, None, "0xMANAGER");
        let manager = Account::from("0xMANAGER");
        assert!(!Eligibility::evaluate(None, Some(&manager), false).any());
        assert!(!Eligibility::evaluate(Some(&state), None, false).any());
    }

    #[test]
    fn for_kind__enter_carries_stake_and_gas_ceiling() {
        assert_eq!(
            ActionRequest::for_kind(ActionKind::Enter),
            ActionRequest::Enter {
                stake: 1_000_000,
                gas_limit: 300_000,
            }
        );
        for kind in ActionKind::ALL {
            assert_eq!(ActionRequest::for_kind(kind).kind(), kind);
        }
    }

    proptest! {
        #[test]
        fn evaluate__enter_is_closed_once_completed(
            winner in "0x[a-fA-F0-9]{4}",
            manager in "0x[a-fA-F0-9]{4}",
            account in "0x[a-fA-F0-9]{4}",
        ) {
            let state = lottery(true, Some(&winner), &manager);
            let account = Account::new(account);
            let eligibility = Eligibility::evaluate(Some(&state), Some(&account), false);
            prop_assert!(!eligibility.enter);
        }
    }
}
