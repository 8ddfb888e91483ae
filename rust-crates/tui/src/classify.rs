use crate::{
    action::ActionKind,
    error::SubmissionFailure,
};

/// Reasons the remote side is known to give when it rejects a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureReason {
    NotWinner,
    NotEnded,
    AlreadyClaimed,
    UnpredictableGas,
    Unknown,
}

const GAS_CODES: [&str; 2] = ["UNPREDICTABLE_GAS_LIMIT", "OUT_OF_GAS"];
const GAS_PHRASES: [&str; 3] = ["outofgas", "out of gas", "cannot estimate gas"];

impl FailureReason {
    pub fn parse(failure: &SubmissionFailure) -> Self {
        let reason = failure.reason.as_str();
        if reason.contains("You are not the winner") {
            return FailureReason::NotWinner;
        }
        if reason.contains("Lottery has not ended yet") {
            return FailureReason::NotEnded;
        }
        if reason.contains("Prize has already been claimed") {
            return FailureReason::AlreadyClaimed;
        }
        let gas_code = failure
            .code
            .as_deref()
            .is_some_and(|code| GAS_CODES.iter().any(|c| code.eq_ignore_ascii_case(c)));
        let lowered = reason.to_ascii_lowercase();
        if gas_code || GAS_PHRASES.iter().any(|p| lowered.contains(p)) {
            return FailureReason::UnpredictableGas;
        }
        FailureReason::Unknown
    }

    fn message(self) -> Option<&'static str> {
        match self {
            FailureReason::NotWinner => Some("You are not the winner."),
            FailureReason::NotEnded => Some("The lottery has not ended yet."),
            FailureReason::AlreadyClaimed => Some("Prize has already been claimed."),
            FailureReason::UnpredictableGas => {
                Some("Failed to estimate gas. Check the contract state.")
            }
            FailureReason::Unknown => None,
        }
    }
}

pub fn fallback_message(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Enter => "Error entering the lottery. Please try again.",
        ActionKind::PickWinner => "Error picking the winner. Please try again.",
        ActionKind::ClaimPrize => "Error claiming prize. Please try again.",
        ActionKind::Reset => "Error resetting the lottery. Please try again.",
    }
}

/// Display message for a rejected `kind` submission.
pub fn classify(kind: ActionKind, failure: &SubmissionFailure) -> &'static str {
    FailureReason::parse(failure)
        .message()
        .unwrap_or_else(|| fallback_message(kind))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn classify__known_reasons_map_to_fixed_phrases() {
        let cases = [
            (
                "execution reverted: You are not the winner",
                "You are not the winner.",
            ),
            (
                "Revert(123): Lottery has not ended yet",
                "The lottery has not ended yet.",
            ),
            (
                "LogResult { results: [Ok(\"Prize has already been claimed\")] }",
                "Prize has already been claimed.",
            ),
            (
                "Transaction failed: PanicInstruction { reason: OutOfGas }",
                "Failed to estimate gas. Check the contract state.",
            ),
        ];
        for (reason, expected) in cases {
            assert_eq!(
                classify(ActionKind::ClaimPrize, &SubmissionFailure::new(reason)),
                expected,
                "reason: {reason}"
            );
        }
    }

    #[test]
    fn classify__gas_code_wins_without_reason_text() {
        // given
        let failure = SubmissionFailure::with_code("UNPREDICTABLE_GAS_LIMIT", "");

        // when
        let message = classify(ActionKind::Enter, &failure);

        // then
        assert_eq!(message, "Failed to estimate gas. Check the contract state.");
    }

    #[test]
    fn classify__unknown_reasons_use_the_action_fallback() {
        let failure = SubmissionFailure::with_code("CALL_EXCEPTION", "connection reset");
        assert_eq!(
            classify(ActionKind::Enter, &failure),
            "Error entering the lottery. Please try again."
        );
        assert_eq!(
            classify(ActionKind::ClaimPrize, &failure),
            "Error claiming prize. Please try again."
        );
        assert_eq!(
            classify(ActionKind::Reset, &failure),
            "Error resetting the lottery. Please try again."
        );
        assert_eq!(
            classify(ActionKind::PickWinner, &failure),
            "Error picking the winner. Please try again."
        );
    }

    fn action_kind() -> impl Strategy<Value = ActionKind> {
        prop::sample::select(ActionKind::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn classify__never_drops_an_unknown_reason(
            kind in action_kind(),
            reason in "[a-z ]{0,40}",
        ) {
            prop_assume!(!reason.contains("gas"));
            let failure = SubmissionFailure::new(reason);
            prop_assert_eq!(classify(kind, &failure), fallback_message(kind));
        }
    }
}
