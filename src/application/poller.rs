use crate::config::PollConfig;
use crate::domain::callback::{CallbackParams, CallbackStatus};
use crate::domain::money::Balance;
use crate::domain::outcome::Outcome;
use crate::domain::ports::BalanceSourceBox;
use crate::domain::reconciliation::{Failure, Phase, ReconciliationState};
use crate::error::Result;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Decides whether a wallet top-up landed after a gateway redirect.
///
/// `Reconciler` compares the wallet balance captured on entry with balances
/// read on a fixed interval until the increase covers the expected amount or
/// the attempt budget runs out. A flow can publish every state change on its
/// own `watch` channel so a UI can render progress.
pub struct Reconciler {
    source: BalanceSourceBox,
    config: PollConfig,
}

impl Reconciler {
    /// Creates a new `Reconciler`.
    ///
    /// # Arguments
    ///
    /// * `source` - Where balances are read from.
    /// * `config` - Interval, attempt cap and credit tolerance.
    pub fn new(source: BalanceSourceBox, config: PollConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Runs one reconciliation flow to a terminal phase.
    ///
    /// Each call starts from a fresh state, so repeating a call with the same
    /// parameters against an unchanged wallet yields the same phase.
    pub async fn reconcile(&self, params: &CallbackParams) -> Result<Outcome> {
        let (state_tx, _) = watch::channel(ReconciliationState::new());
        self.reconcile_observed(params, &state_tx).await
    }

    /// Like [`Reconciler::reconcile`], publishing every state change of this
    /// flow on `state_tx`. The channel should not be shared between flows.
    pub async fn reconcile_observed(
        &self,
        params: &CallbackParams,
        state_tx: &watch::Sender<ReconciliationState>,
    ) -> Result<Outcome> {
        let mut state = ReconciliationState::new();
        publish(state_tx, &state);

        let initial = self.read_balance().await;
        state.capture_initial(initial)?;
        publish(state_tx, &state);
        info!(
            intention_id = params.intention_id(),
            initial_balance = ?initial.map(|b| b.to_string()),
            "Captured initial balance"
        );

        if let Some(phase) = self.gateway_verdict(params) {
            return self.conclude(state_tx, &mut state, phase, params);
        }

        state.observe(self.read_balance().await)?;
        if state.credited(params.amount(), self.config.credit_ratio) {
            return self.conclude(state_tx, &mut state, Phase::Success, params);
        }

        state.begin_processing()?;
        publish(state_tx, &state);
        info!(
            intention_id = params.intention_id(),
            max_attempts = self.config.max_attempts,
            "Top-up not visible yet, polling balance"
        );

        let mut ticker = time::interval_at(Instant::now() + self.config.interval, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while state.poll_count() < self.config.max_attempts {
            ticker.tick().await;
            state.record_tick(self.read_balance().await)?;
            publish(state_tx, &state);
            debug!(
                poll_count = state.poll_count(),
                current_balance = ?state.current_balance().map(|b| b.to_string()),
                "Polled balance"
            );

            if state.credited(params.amount(), self.config.credit_ratio) {
                return self.conclude(state_tx, &mut state, Phase::Success, params);
            }
        }

        self.conclude(state_tx, &mut state, Phase::Timeout, params)
    }

    /// Terminal phase dictated by the redirect alone, if any.
    fn gateway_verdict(&self, params: &CallbackParams) -> Option<Phase> {
        if params.status() == &CallbackStatus::Failed || params.error_message().is_some() {
            let message = params.error_message().map(str::to_string);
            return Some(Phase::Error(Failure::GatewayReported(message)));
        }
        match params.status() {
            CallbackStatus::Successful if params.intention_id().is_some() => None,
            _ => Some(Phase::Error(Failure::InvalidResponse)),
        }
    }

    /// Fetches a balance, logging and swallowing failures.
    async fn read_balance(&self) -> Option<Balance> {
        match self.source.fetch_balance().await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!("Balance fetch failed: {e}");
                None
            }
        }
    }

    fn conclude(
        &self,
        state_tx: &watch::Sender<ReconciliationState>,
        state: &mut ReconciliationState,
        phase: Phase,
        params: &CallbackParams,
    ) -> Result<Outcome> {
        state.finish(phase)?;
        publish(state_tx, state);
        info!(
            intention_id = params.intention_id(),
            phase = state.phase().name(),
            poll_count = state.poll_count(),
            "Reconciliation finished"
        );
        Ok(Outcome::from_state(state, params))
    }

}

fn publish(state_tx: &watch::Sender<ReconciliationState>, state: &ReconciliationState) {
    state_tx.send_replace(state.clone());
}
