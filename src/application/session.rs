use super::poller::Reconciler;
use crate::domain::callback::CallbackParams;
use crate::domain::outcome::Outcome;
use crate::domain::reconciliation::ReconciliationState;
use crate::error::Result;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// A reconciliation flow running on its own task.
///
/// The session owns the task: `cancel` or dropping the session aborts it,
/// which also drops the polling interval and any pending navigation timer.
pub struct ReconciliationSession {
    state: watch::Receiver<ReconciliationState>,
    outcome: Option<oneshot::Receiver<Result<Outcome>>>,
    navigate: Option<oneshot::Receiver<()>>,
    handle: JoinHandle<()>,
}

impl ReconciliationSession {
    /// Starts reconciling `params` in the background.
    ///
    /// After a successful flow the session fires its navigation signal once the
    /// reconciler's redirect delay has elapsed.
    pub fn spawn(reconciler: Arc<Reconciler>, params: CallbackParams) -> Self {
        let (state_tx, state) = watch::channel(ReconciliationState::new());
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (navigate_tx, navigate_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let result = reconciler.reconcile_observed(&params, &state_tx).await;
            let succeeded = matches!(&result, Ok(outcome) if outcome.is_success());
            if let Err(e) = &result {
                error!("Reconciliation aborted: {e}");
            }
            if outcome_tx.send(result).is_err() {
                debug!("Outcome receiver dropped");
            }

            if succeeded {
                tokio::time::sleep(reconciler.config().redirect_delay).await;
                let _ = navigate_tx.send(());
            }
        });

        Self {
            state,
            outcome: Some(outcome_rx),
            navigate: Some(navigate_rx),
            handle,
        }
    }

    /// Live view of this session's flow. Other flows on the same reconciler
    /// publish elsewhere.
    pub fn state(&self) -> watch::Receiver<ReconciliationState> {
        self.state.clone()
    }

    /// Waits for the terminal outcome. Returns `None` if the session was
    /// cancelled or the outcome was already taken.
    pub async fn outcome(&mut self) -> Option<Result<Outcome>> {
        let rx = self.outcome.take()?;
        rx.await.ok()
    }

    /// Resolves `true` when it is time to navigate away, `false` if the flow
    /// did not succeed or was cancelled.
    pub async fn navigation(&mut self) -> bool {
        match self.navigate.take() {
            Some(rx) => rx.await.is_ok(),
            None => false,
        }
    }

    /// Stops the flow. No further ticks, fetches or signals happen afterwards.
    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ReconciliationSession {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
