use crate::domain::money::{Amount, Balance};
use crate::domain::ports::BalanceSource;
use crate::error::{ReconcileError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct WalletState {
    balance: Balance,
    /// Credit applied once this many fetches have been served.
    pending: Option<(usize, Amount)>,
}

/// A thread-safe in-memory wallet.
///
/// Can schedule a credit that only becomes visible after a number of balance
/// reads, which mimics a gateway whose ledger lags behind the redirect.
/// `Clone` shares the underlying wallet.
#[derive(Debug, Default, Clone)]
pub struct InMemoryWallet {
    state: Arc<RwLock<WalletState>>,
    fetches: Arc<AtomicUsize>,
}

impl InMemoryWallet {
    /// Creates a wallet holding `balance`.
    pub fn new(balance: Balance) -> Self {
        Self {
            state: Arc::new(RwLock::new(WalletState {
                balance,
                pending: None,
            })),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Credits the wallet immediately.
    pub async fn credit(&self, amount: Amount) -> Result<()> {
        let mut state = self.state.write().await;
        state.balance = add_credit(state.balance, amount)?;
        Ok(())
    }

    /// Credits the wallet once `after_fetches` more reads have been served.
    pub async fn schedule_credit(&self, after_fetches: usize, amount: Amount) {
        let due = self.fetches.load(Ordering::SeqCst) + after_fetches;
        self.state.write().await.pending = Some((due, amount));
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceSource for InMemoryWallet {
    async fn fetch_balance(&self) -> Result<Balance> {
        let served = self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.write().await;
        if let Some((due, amount)) = state.pending
            && served >= due
        {
            state.pending = None;
            state.balance = add_credit(state.balance, amount)?;
        }
        Ok(state.balance)
    }
}

fn add_credit(balance: Balance, amount: Amount) -> Result<Balance> {
    balance.checked_add(amount.into()).ok_or_else(|| {
        ReconcileError::BalanceUnavailable(format!("crediting {amount} overflows balance"))
    })
}

/// Replays a fixed sequence of balance reads. `None` entries fail the fetch.
///
/// Once the script runs out the last entry repeats forever.
#[derive(Debug, Clone)]
pub struct ScriptedBalanceSource {
    script: Arc<RwLock<VecDeque<Option<Balance>>>>,
    fetches: Arc<AtomicUsize>,
}

impl ScriptedBalanceSource {
    pub fn new(script: impl IntoIterator<Item = Option<Balance>>) -> Self {
        Self {
            script: Arc::new(RwLock::new(script.into_iter().collect())),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BalanceSource for ScriptedBalanceSource {
    async fn fetch_balance(&self) -> Result<Balance> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.write().await;
        let next = if script.len() > 1 {
            script.pop_front().flatten()
        } else {
            script.front().copied().flatten()
        };
        next.ok_or_else(|| ReconcileError::BalanceUnavailable("scripted outage".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_in_memory_wallet_credit() {
        let wallet = InMemoryWallet::new(Balance::new(dec!(50)));
        wallet.credit(Amount::new(dec!(25)).unwrap()).await.unwrap();

        assert_eq!(wallet.fetch_balance().await.unwrap(), Balance::new(dec!(75)));
        assert_eq!(wallet.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_wallet_scheduled_credit() {
        let wallet = InMemoryWallet::new(Balance::new(dec!(50)));
        wallet
            .schedule_credit(2, Amount::new(dec!(100)).unwrap())
            .await;

        assert_eq!(wallet.fetch_balance().await.unwrap(), Balance::new(dec!(50)));
        assert_eq!(wallet.fetch_balance().await.unwrap(), Balance::new(dec!(50)));
        assert_eq!(wallet.fetch_balance().await.unwrap(), Balance::new(dec!(150)));
        assert_eq!(wallet.fetch_balance().await.unwrap(), Balance::new(dec!(150)));
    }

    #[tokio::test]
    async fn test_clone_shares_wallet() {
        let wallet = InMemoryWallet::default();
        let handle = wallet.clone();
        handle.credit(Amount::new(dec!(5)).unwrap()).await.unwrap();

        assert_eq!(wallet.fetch_balance().await.unwrap(), Balance::new(dec!(5)));
        assert_eq!(handle.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_in_memory_wallet_overflow_is_an_error() {
        let wallet = InMemoryWallet::new(Balance::new(rust_decimal::Decimal::MAX));
        assert!(matches!(
            wallet.credit(Amount::new(dec!(1)).unwrap()).await,
            Err(ReconcileError::BalanceUnavailable(_))
        ));

        wallet
            .schedule_credit(0, Amount::new(dec!(1)).unwrap())
            .await;
        assert!(matches!(
            wallet.fetch_balance().await,
            Err(ReconcileError::BalanceUnavailable(_))
        ));
        assert_eq!(
            wallet.fetch_balance().await.unwrap(),
            Balance::new(rust_decimal::Decimal::MAX)
        );
    }

    #[tokio::test]
    async fn test_scripted_source_repeats_last_entry() {
        let source = ScriptedBalanceSource::new([
            Some(Balance::new(dec!(1))),
            None,
            Some(Balance::new(dec!(3))),
        ]);

        assert_eq!(source.fetch_balance().await.unwrap(), Balance::new(dec!(1)));
        assert!(matches!(
            source.fetch_balance().await,
            Err(ReconcileError::BalanceUnavailable(_))
        ));
        assert_eq!(source.fetch_balance().await.unwrap(), Balance::new(dec!(3)));
        assert_eq!(source.fetch_balance().await.unwrap(), Balance::new(dec!(3)));
        assert_eq!(source.fetch_count(), 4);
    }
}
