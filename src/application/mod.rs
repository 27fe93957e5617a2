//! Application layer orchestrating a reconciliation flow.
//!
//! `Reconciler` runs the flow itself against a `BalanceSource`, while
//! `ReconciliationSession` runs it on a spawned `tokio` task that can be
//! observed and cancelled from the outside.

pub mod poller;
pub mod session;
