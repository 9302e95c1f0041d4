use std::time::Duration;
use tokio::time::Instant;

/// Throttling state of a single domain
///
/// Owned by the rate limiter; callers only ever see snapshots of it.
#[derive(Debug, Clone, PartialEq)]
pub struct RateState {
    /// The domain this state belongs to
    pub domain: String,

    /// Allowed requests per second; `None` means unlimited
    pub rate_limit: Option<f64>,

    /// When the last permitted request to this domain was released
    pub last_request_at: Option<Instant>,
}

impl RateState {
    /// Creates an unlimited state for a domain
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            rate_limit: None,
            last_request_at: None,
        }
    }

    /// Minimum spacing between two requests, if the domain is limited
    ///
    /// Rates too small to express as a `Duration` saturate to `Duration::MAX`.
    pub fn min_interval(&self) -> Option<Duration> {
        self.rate_limit
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .map(|rate| Duration::try_from_secs_f64(1.0 / rate).unwrap_or(Duration::MAX))
    }

    /// Calculates how long a request arriving at `now` has to wait
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, now: Instant) -> Option<Duration> {
        let min_interval = self.min_interval()?;
        let last = self.last_request_at?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < min_interval {
            Some(min_interval - elapsed)
        } else {
            None
        }
    }

    /// Records that a request was released at `now`
    pub fn record_request(&mut self, now: Instant) {
        self.last_request_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limited(rate: f64) -> RateState {
        let mut state = RateState::new("example.com");
        state.rate_limit = Some(rate);
        state
    }

    #[test]
    fn test_new_state_is_unlimited() {
        let state = RateState::new("example.com");
        assert_eq!(state.domain, "example.com");
        assert!(state.rate_limit.is_none());
        assert!(state.min_interval().is_none());
        assert!(state.time_until_next_request(Instant::now()).is_none());
    }

    #[test]
    fn test_min_interval() {
        assert_eq!(limited(2.0).min_interval(), Some(Duration::from_millis(500)));
        assert_eq!(limited(0.5).min_interval(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_non_positive_rate_is_ignored() {
        assert!(limited(0.0).min_interval().is_none());
        assert!(limited(f64::NAN).min_interval().is_none());
    }

    #[test]
    fn test_tiny_rate_saturates() {
        assert_eq!(limited(1e-30).min_interval(), Some(Duration::MAX));
        assert_eq!(limited(f64::MIN_POSITIVE).min_interval(), Some(Duration::MAX));

        let mut state = limited(1e-30);
        let now = Instant::now();
        state.record_request(now);
        let wait = state
            .time_until_next_request(now + Duration::from_secs(60))
            .unwrap();
        assert_eq!(wait, Duration::MAX - Duration::from_secs(60));
    }

    #[test]
    fn test_first_request_never_waits() {
        let state = limited(1.0);
        assert!(state.time_until_next_request(Instant::now()).is_none());
    }

    #[test]
    fn test_time_until_next_request() {
        let mut state = limited(1.0);
        let now = Instant::now();
        state.record_request(now);

        assert_eq!(
            state.time_until_next_request(now),
            Some(Duration::from_secs(1))
        );

        let soon = now + Duration::from_millis(400);
        assert_eq!(
            state.time_until_next_request(soon),
            Some(Duration::from_millis(600))
        );

        let later = now + Duration::from_millis(1100);
        assert!(state.time_until_next_request(later).is_none());
    }
}
