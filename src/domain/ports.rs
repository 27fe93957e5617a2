use super::money::Balance;
use crate::error::Result;
use async_trait::async_trait;

/// Reads the current wallet balance.
///
/// Implementations report every failure as an error; the reconciler decides
/// which failures to swallow.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn fetch_balance(&self) -> Result<Balance>;
}

pub type BalanceSourceBox = Box<dyn BalanceSource>;

#[async_trait]
impl<T: BalanceSource + ?Sized> BalanceSource for std::sync::Arc<T> {
    async fn fetch_balance(&self) -> Result<Balance> {
        (**self).fetch_balance().await
    }
}
