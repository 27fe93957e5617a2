#![allow(dead_code)]

use rust_decimal::Decimal;
use std::sync::Arc;
use topup_reconciler::application::poller::Reconciler;
use topup_reconciler::config::PollConfig;
use topup_reconciler::domain::callback::CallbackParams;
use topup_reconciler::domain::money::Balance;
use topup_reconciler::infrastructure::in_memory::ScriptedBalanceSource;

pub const SUCCESS_QUERY: &str = "intention_id=int_42&status=successful&amount=100";

/// Reads made before the first polling tick: the baseline capture and the
/// immediate credit check.
pub const PRE_POLL_FETCHES: usize = 2;

/// Reads made by polling ticks alone.
pub fn tick_fetches(source: &ScriptedBalanceSource) -> usize {
    source.fetch_count() - PRE_POLL_FETCHES
}

pub fn params(query: &str) -> CallbackParams {
    CallbackParams::from_query(query)
}

/// Balance script for a wallet at `initial` that shows a credit of `credit`
/// starting at polling tick `tick` (0 means the immediate check after the
/// baseline already sees it).
pub fn credited_at_tick(initial: Decimal, credit: Decimal, tick: usize) -> Vec<Option<Balance>> {
    let mut script = vec![Some(Balance::new(initial)); tick + 1];
    script.push(Some(Balance::new(initial + credit)));
    script
}

pub fn scripted(script: Vec<Option<Balance>>) -> Arc<ScriptedBalanceSource> {
    Arc::new(ScriptedBalanceSource::new(script))
}

pub fn reconciler(source: &Arc<ScriptedBalanceSource>) -> Reconciler {
    Reconciler::new(Box::new(source.clone()), PollConfig::default())
}
