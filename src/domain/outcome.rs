use super::callback::CallbackParams;
use super::money::{Amount, Balance};
use super::reconciliation::{Failure, Phase, ReconciliationState};
use serde::Serialize;

pub const SUCCESS_MESSAGE: &str = "Payment successful! Your wallet has been topped up.";
pub const GENERIC_FAILURE_MESSAGE: &str = "Payment failed. Please try again.";
pub const INVALID_RESPONSE_MESSAGE: &str = "Invalid payment response. Please contact support.";
pub const TIMEOUT_MESSAGE: &str =
    "Payment is still processing. Please check your wallet balance in a few minutes.";

/// What the user is offered once the flow has stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    ViewWallet,
    RetryPayment,
    CheckWalletLater,
    Refresh,
}

impl RecoveryAction {
    pub fn label(&self) -> &'static str {
        match self {
            RecoveryAction::ViewWallet => "View wallet",
            RecoveryAction::RetryPayment => "Retry payment",
            RecoveryAction::CheckWalletLater => "Check wallet later",
            RecoveryAction::Refresh => "Refresh",
        }
    }
}

/// User-facing message for a terminal phase. `None` while still running.
pub fn terminal_message(phase: &Phase) -> Option<String> {
    let message = match phase {
        Phase::Loading | Phase::Processing => return None,
        Phase::Success => SUCCESS_MESSAGE,
        Phase::Error(Failure::GatewayReported(Some(message))) => message.as_str(),
        Phase::Error(Failure::GatewayReported(None)) => GENERIC_FAILURE_MESSAGE,
        Phase::Error(Failure::InvalidResponse) => INVALID_RESPONSE_MESSAGE,
        Phase::Timeout => TIMEOUT_MESSAGE,
    };
    Some(message.to_string())
}

pub fn recovery_action(phase: &Phase) -> Option<RecoveryAction> {
    match phase {
        Phase::Loading | Phase::Processing => None,
        Phase::Success => Some(RecoveryAction::ViewWallet),
        Phase::Error(Failure::GatewayReported(_)) => Some(RecoveryAction::RetryPayment),
        Phase::Error(Failure::InvalidResponse) => Some(RecoveryAction::Refresh),
        Phase::Timeout => Some(RecoveryAction::CheckWalletLater),
    }
}

/// Final result of a reconciliation flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    #[serde(flatten)]
    pub phase: Phase,
    pub message: String,
    pub recovery: Option<RecoveryAction>,
    pub intention_id: Option<String>,
    pub expected_amount: Option<Amount>,
    pub initial_balance: Option<Balance>,
    pub final_balance: Option<Balance>,
    pub poll_count: u32,
}

impl Outcome {
    /// Builds the outcome from a state that has reached a terminal phase.
    pub fn from_state(state: &ReconciliationState, params: &CallbackParams) -> Self {
        let phase = state.phase().clone();
        Self {
            message: terminal_message(&phase).unwrap_or_default(),
            recovery: recovery_action(&phase),
            phase,
            intention_id: params.intention_id().map(str::to_string),
            expected_amount: params.amount(),
            initial_balance: state.initial_balance(),
            final_balance: state.current_balance(),
            poll_count: state.poll_count(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.phase == Phase::Success
    }
}
