//! Currency conversion abstractions

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64>;
}

/// Converts `amount` from one currency to another. Same-currency amounts are
/// returned untouched without asking the provider; a provider error leaves the
/// amount unconverted.
pub async fn convert(
    provider: &(dyn CurrencyRateProvider + Send + Sync),
    amount: f64,
    from: &str,
    to: &str,
) -> f64 {
    if from == to {
        return amount;
    }
    match provider.get_rate(from, to).await {
        Ok(rate) => amount * rate,
        Err(e) => {
            debug!("Currency conversion failed from {from} to {to}: {e}");
            amount
        }
    }
}
