use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::LlmError;

/// Decides whether a failed attempt may be retried
pub type RetryPredicate = Arc<dyn Fn(&LlmError) -> bool + Send + Sync>;

/// Retry, admission and pacing settings for one executor
#[derive(Clone)]
pub struct ResilienceOptions {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Backoff before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any single backoff
    pub max_backoff: Duration,
    /// Scale each backoff by a random factor in `[0.875, 1.125]`
    pub jitter: bool,
    /// Deadline for a single attempt
    pub request_timeout: Option<Duration>,
    /// Calls admitted at once
    pub max_concurrent_requests: usize,
    /// Minimum spacing between successive call starts
    pub min_delay_between_requests: Option<Duration>,
    /// Retry classification, [`LlmError::is_transient`] by default
    pub retry_predicate: RetryPredicate,
}

impl Default for ResilienceOptions {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
            jitter: true,
            request_timeout: None,
            max_concurrent_requests: usize::MAX,
            min_delay_between_requests: None,
            retry_predicate: Arc::new(LlmError::is_transient),
        }
    }
}

impl ResilienceOptions {
    /// Replace the retry classification
    #[must_use]
    pub fn retry_when(mut self, predicate: impl Fn(&LlmError) -> bool + Send + Sync + 'static) -> Self {
        self.retry_predicate = Arc::new(predicate);
        self
    }

    pub(crate) fn should_retry(&self, error: &LlmError) -> bool {
        (self.retry_predicate)(error)
    }

    /// Backoff before retry number `attempt + 1`, before jitter
    pub fn base_backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2_u32.saturating_pow(attempt))
            .min(self.max_backoff)
    }
}

impl fmt::Debug for ResilienceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResilienceOptions")
            .field("max_retries", &self.max_retries)
            .field("initial_backoff", &self.initial_backoff)
            .field("max_backoff", &self.max_backoff)
            .field("jitter", &self.jitter)
            .field("request_timeout", &self.request_timeout)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("min_delay_between_requests", &self.min_delay_between_requests)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = ResilienceOptions::default();
        assert_eq!(options.max_retries, 2);
        assert_eq!(options.initial_backoff, Duration::from_millis(200));
        assert_eq!(options.max_backoff, Duration::from_secs(2));
        assert!(options.jitter);
        assert!(options.request_timeout.is_none());
        assert!(options.min_delay_between_requests.is_none());
        assert!(options.should_retry(&LlmError::Transport("reset".into())));
        assert!(!options.should_retry(&LlmError::Upstream("400".into())));
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let options = ResilienceOptions {
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(500),
            ..ResilienceOptions::default()
        };

        assert_eq!(options.base_backoff(0), Duration::from_millis(100));
        assert_eq!(options.base_backoff(1), Duration::from_millis(200));
        assert_eq!(options.base_backoff(2), Duration::from_millis(400));
        assert_eq!(options.base_backoff(3), Duration::from_millis(500));
        assert_eq!(options.base_backoff(40), Duration::from_millis(500));
    }

    #[test]
    fn custom_predicate() {
        let options = ResilienceOptions::default().retry_when(|e| matches!(e, LlmError::Upstream(_)));
        assert!(options.should_retry(&LlmError::Upstream("503".into())));
        assert!(!options.should_retry(&LlmError::Transport("reset".into())));
    }
}
