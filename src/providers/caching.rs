use crate::core::currency::CurrencyRateProvider;
use crate::core::notice::{LogNotifier, Notice, Notifier};
use crate::core::task::BackgroundTask;
use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_RATE_TTL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_RATE_TIMEOUT: Duration = Duration::from_secs(8);

type PairKey = (String, String);
type PendingRate = Shared<BoxFuture<'static, f64>>;

#[derive(Debug, Clone, Copy)]
struct CachedRate {
    rate: f64,
    fetched_at: Instant,
}

#[derive(Default)]
struct RateState {
    cache: HashMap<PairKey, CachedRate>,
    pending: HashMap<PairKey, PendingRate>,
}

/// Caching, de-duplicating front for a `CurrencyRateProvider`.
///
/// Fresh entries are served from memory. Misses share a single in-flight
/// request per pair. A failed request falls back to the last known rate, or
/// to 1.0 with a notice when there is none, so `get_rate` never fails.
pub struct CachingCurrencyRateProvider<T: CurrencyRateProvider> {
    inner: Arc<T>,
    state: Arc<Mutex<RateState>>,
    notifier: Arc<dyn Notifier>,
    ttl: Duration,
    timeout: Duration,
}

impl<T: CurrencyRateProvider> Clone for CachingCurrencyRateProvider<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            state: Arc::clone(&self.state),
            notifier: Arc::clone(&self.notifier),
            ttl: self.ttl,
            timeout: self.timeout,
        }
    }
}

impl<T: CurrencyRateProvider + 'static> CachingCurrencyRateProvider<T> {
    pub fn new(inner: T) -> Self {
        Self::with_settings(inner, DEFAULT_RATE_TTL, DEFAULT_RATE_TIMEOUT, Arc::new(LogNotifier))
    }

    pub fn with_settings(
        inner: T,
        ttl: Duration,
        timeout: Duration,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(inner),
            state: Arc::new(Mutex::new(RateState::default())),
            notifier,
            ttl,
            timeout,
        }
    }

    pub async fn rate(&self, from: &str, to: &str) -> f64 {
        if from == to {
            return 1.0;
        }
        let key = (from.to_string(), to.to_string());

        let pending = {
            let mut state = self.state.lock().await;
            if let Some(cached) = state.cache.get(&key) {
                if cached.fetched_at.elapsed() < self.ttl {
                    debug!("Cache hit for currency rate: {from}-{to}");
                    return cached.rate;
                }
                debug!("Cache entry expired for currency rate: {from}-{to}");
            }

            match state.pending.get(&key) {
                Some(in_flight) => {
                    debug!("Joining in-flight request for currency rate: {from}-{to}");
                    in_flight.clone()
                }
                None => {
                    debug!("Cache miss for currency rate: {from}-{to}");
                    let request = self.request(key.clone());
                    state.pending.insert(key, request.clone());
                    request
                }
            }
        };

        pending.await
    }

    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> f64 {
        if from == to {
            return amount;
        }
        amount * self.rate(from, to).await
    }

    fn request(&self, key: PairKey) -> PendingRate {
        let inner = Arc::clone(&self.inner);
        let state = Arc::clone(&self.state);
        let notifier = Arc::clone(&self.notifier);
        let timeout = self.timeout;

        async move {
            let (from, to) = (&key.0, &key.1);
            let outcome = match tokio::time::timeout(timeout, inner.get_rate(from, to)).await {
                Ok(Ok(rate)) if rate.is_finite() && rate > 0.0 => Ok(rate),
                Ok(Ok(rate)) => Err(format!("invalid rate {rate}")),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!("timed out after {timeout:?}")),
            };

            let mut state = state.lock().await;
            state.pending.remove(&key);

            match outcome {
                Ok(rate) => {
                    state.cache.insert(
                        key.clone(),
                        CachedRate {
                            rate,
                            fetched_at: Instant::now(),
                        },
                    );
                    rate
                }
                Err(reason) => {
                    if let Some(stale) = state.cache.get(&key) {
                        debug!("Rate fetch for {from}-{to} failed ({reason}), using stale rate");
                        return stale.rate;
                    }
                    warn!("Rate fetch for {from}-{to} failed ({reason}), falling back to 1.0");
                    notifier.notify(Notice::RateUnavailable {
                        from: from.clone(),
                        to: to.clone(),
                    });
                    1.0
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Drops entries older than the TTL. Expired entries are also rechecked on
    /// access, so this only bounds memory.
    pub async fn purge_expired(&self) -> usize {
        let mut state = self.state.lock().await;
        let before = state.cache.len();
        let ttl = self.ttl;
        state.cache.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        let purged = before - state.cache.len();
        if purged > 0 {
            debug!(purged, "Purged expired currency rates");
        }
        purged
    }

    pub fn spawn_purge_task(&self, interval: Duration) -> BackgroundTask {
        let provider = self.clone();
        BackgroundTask::spawn("rate-purge", async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                provider.purge_expired().await;
            }
        })
    }

    /// Fetches every ordered pair of distinct currencies one after another.
    pub async fn refresh_rates(&self, currencies: &[String]) {
        for from in currencies {
            for to in currencies.iter().filter(|to| *to != from) {
                self.rate(from, to).await;
            }
        }
        info!(count = currencies.len(), "Currency rates refreshed");
    }

    /// Snapshot of the cached rates, keyed `FROM-TO`.
    pub async fn cached_rates(&self) -> Vec<(String, f64)> {
        let state = self.state.lock().await;
        let mut rates: Vec<(String, f64)> = state
            .cache
            .iter()
            .map(|((from, to), entry)| (format!("{from}-{to}"), entry.rate))
            .collect();
        rates.sort_by(|a, b| a.0.cmp(&b.0));
        rates
    }

    #[cfg(test)]
    async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }
}

#[async_trait]
impl<T: CurrencyRateProvider + 'static> CurrencyRateProvider for CachingCurrencyRateProvider<T> {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        Ok(self.rate(from, to).await)
    }
}
