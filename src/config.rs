use crate::error::{ReconcileError, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
/// Share of the expected amount that must show up in the balance. Leaves room
/// for gateway fees and rounding.
pub const DEFAULT_CREDIT_RATIO: Decimal = dec!(0.99);
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Timing and tolerance knobs for a reconciliation flow.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Delay between polling ticks.
    pub interval: Duration,
    /// Number of ticks before the flow gives up with a timeout.
    pub max_attempts: u32,
    pub credit_ratio: Decimal,
    /// Delay between success and the navigation-away signal.
    pub redirect_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            credit_ratio: DEFAULT_CREDIT_RATIO,
            redirect_delay: DEFAULT_REDIRECT_DELAY,
        }
    }
}

impl PollConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(ReconcileError::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(ReconcileError::InvalidConfig(
                "max attempts must be at least 1".to_string(),
            ));
        }
        if self.credit_ratio <= Decimal::ZERO || self.credit_ratio > Decimal::ONE {
            return Err(ReconcileError::InvalidConfig(format!(
                "credit ratio must be in (0, 1], got {}",
                self.credit_ratio
            )));
        }
        Ok(())
    }

    /// Upper bound on time spent polling.
    pub fn polling_budget(&self) -> Duration {
        self.interval * self.max_attempts
    }
}
