//! Per-domain rate limiting
//!
//! Each domain owns its own async lock, so concurrent acquirers of the same
//! domain are serialized: the check of `last_request_at`, the wait, and the
//! update happen as one step. Acquirers of different domains never block
//! each other.

use crate::state::RateState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;

/// Enforces a minimum interval between requests to the same domain
#[derive(Debug, Default)]
pub struct RateLimiter {
    rates: RwLock<HashMap<String, f64>>,
    slots: Mutex<HashMap<String, Arc<AsyncMutex<RateState>>>>,
}

impl RateLimiter {
    /// Creates a limiter with no configured rates (every domain unlimited)
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a limiter with initial rates, keyed by domain
    pub fn with_rates<I, S>(rates: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let limiter = Self::new();
        for (domain, rate) in rates {
            limiter.update_rate(domain.as_ref(), rate);
        }
        limiter
    }

    /// Waits until a request to `domain` is allowed, then claims the slot
    ///
    /// Unlimited domains return immediately. For a domain limited to `R`
    /// requests per second, two consecutive completions are at least `1/R`
    /// apart, however many tasks call this concurrently.
    pub async fn acquire(&self, domain: &str) {
        let key = domain.to_lowercase();
        let Some(rate) = self.rate(&key) else {
            return;
        };

        let slot = self.slot(&key);
        let mut state = slot.lock().await;
        // Re-read under the lock so a rate change made while queued is honored
        state.rate_limit = self.rate(&key).or(Some(rate));

        if let Some(wait) = state.time_until_next_request(Instant::now()) {
            tracing::debug!("Rate limiting {}: waiting {:?}", key, wait);
            tokio::time::sleep(wait).await;
        }

        state.record_request(Instant::now());
    }

    /// Sets the allowed requests per second for a domain
    ///
    /// Takes effect on the next `acquire` for that domain. A non-positive or
    /// non-finite rate makes the domain unlimited.
    pub fn update_rate(&self, domain: &str, requests_per_second: f64) {
        let key = domain.to_lowercase();
        let mut rates = self.rates.write().unwrap_or_else(PoisonError::into_inner);

        if requests_per_second.is_finite() && requests_per_second > 0.0 {
            tracing::debug!("Rate for {} set to {}/s", key, requests_per_second);
            rates.insert(key, requests_per_second);
        } else {
            tracing::warn!(
                "Ignoring rate {} for {}, domain is unlimited",
                requests_per_second,
                key
            );
            rates.remove(&key);
        }
    }

    /// Configured rate for a domain, if any
    pub fn rate(&self, domain: &str) -> Option<f64> {
        self.rates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&domain.to_lowercase())
            .copied()
    }

    /// Copy of a domain's current state
    ///
    /// Returns None while an acquirer holds the domain, or if it was never used.
    pub fn snapshot(&self, domain: &str) -> Option<RateState> {
        let key = domain.to_lowercase();
        let slot = {
            let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.get(&key)?)
        };
        let mut state = slot.try_lock().ok()?.clone();
        state.rate_limit = self.rate(&key);
        Some(state)
    }

    fn slot(&self, key: &str) -> Arc<AsyncMutex<RateState>> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            slots
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(RateState::new(key)))),
        )
    }
}
