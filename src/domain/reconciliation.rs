use super::money::{Amount, Balance};
use crate::error::{ReconcileError, Result};
use rust_decimal::Decimal;
use serde::Serialize;

/// Why a flow ended in the `error` phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "message")]
pub enum Failure {
    /// The gateway redirected with `status=failed` or an `error` parameter.
    GatewayReported(Option<String>),
    /// The redirect carried no status the flow can act on.
    InvalidResponse,
}

/// Lifecycle of a reconciliation flow.
///
/// `Success`, `Error` and `Timeout` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "failure")]
pub enum Phase {
    Loading,
    Processing,
    Success,
    Error(Failure),
    Timeout,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Success | Phase::Error(_) | Phase::Timeout)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Loading => "loading",
            Phase::Processing => "processing",
            Phase::Success => "success",
            Phase::Error(_) => "error",
            Phase::Timeout => "timeout",
        }
    }
}

/// Observable state of one reconciliation flow.
///
/// All mutation goes through the transition methods, which refuse to touch a
/// terminal state. `initial_balance` is written once, while still loading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationState {
    phase: Phase,
    initial_balance: Option<Balance>,
    current_balance: Option<Balance>,
    poll_count: u32,
    #[serde(skip)]
    initial_captured: bool,
}

impl Default for ReconciliationState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Loading,
            initial_balance: None,
            current_balance: None,
            poll_count: 0,
            initial_captured: false,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn initial_balance(&self) -> Option<Balance> {
        self.initial_balance
    }

    pub fn current_balance(&self) -> Option<Balance> {
        self.current_balance
    }

    pub fn poll_count(&self) -> u32 {
        self.poll_count
    }

    /// Records the baseline balance. `None` means the fetch failed.
    pub fn capture_initial(&mut self, balance: Option<Balance>) -> Result<()> {
        if self.phase != Phase::Loading || self.initial_captured {
            return Err(self.invalid("loading"));
        }
        self.initial_balance = balance;
        self.current_balance = balance;
        self.initial_captured = true;
        Ok(())
    }

    /// Records a balance read outside of a polling tick.
    pub fn observe(&mut self, balance: Option<Balance>) -> Result<()> {
        self.ensure_active("loading")?;
        if balance.is_some() {
            self.current_balance = balance;
        }
        Ok(())
    }

    pub fn begin_processing(&mut self) -> Result<()> {
        if self.phase != Phase::Loading {
            return Err(self.invalid("processing"));
        }
        self.phase = Phase::Processing;
        Ok(())
    }

    /// Counts one polling tick. A failed fetch keeps the last known balance.
    pub fn record_tick(&mut self, balance: Option<Balance>) -> Result<()> {
        if self.phase != Phase::Processing {
            return Err(self.invalid("processing"));
        }
        self.poll_count += 1;
        if balance.is_some() {
            self.current_balance = balance;
        }
        Ok(())
    }

    /// Moves to a terminal phase.
    pub fn finish(&mut self, phase: Phase) -> Result<()> {
        if !phase.is_terminal() {
            return Err(ReconcileError::InvalidTransition {
                from: self.phase.name(),
                to: phase.name(),
            });
        }
        self.ensure_active(phase.name())?;
        self.phase = phase;
        Ok(())
    }

    /// Runs the credit test against the captured baseline and latest balance.
    pub fn credited(&self, expected: Option<Amount>, ratio: Decimal) -> bool {
        match (self.initial_balance, self.current_balance) {
            (Some(initial), Some(current)) => is_credited(initial, current, expected, ratio),
            _ => false,
        }
    }

    fn ensure_active(&self, to: &'static str) -> Result<()> {
        if self.phase.is_terminal() {
            Err(self.invalid(to))
        } else {
            Ok(())
        }
    }

    fn invalid(&self, to: &'static str) -> ReconcileError {
        ReconcileError::InvalidTransition {
            from: self.phase.name(),
            to,
        }
    }
}

/// The credit test: has the balance grown by at least `ratio` of the expected
/// top-up? Without an expected amount any strictly positive increase counts.
/// An increase too large to represent is never a credit.
pub fn is_credited(
    initial: Balance,
    current: Balance,
    expected: Option<Amount>,
    ratio: Decimal,
) -> bool {
    let Some(increase) = current.checked_sub(initial).map(|b| b.value()) else {
        return false;
    };
    match expected {
        Some(amount) => amount
            .value()
            .checked_mul(ratio)
            .is_some_and(|threshold| increase >= threshold),
        None => increase > Decimal::ZERO,
    }
}
