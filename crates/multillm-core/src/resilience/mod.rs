//! Retry, admission, pacing and deadlines around provider calls
//!
//! One [`ResilienceExecutor`] owns an admission gate sized by
//! `max_concurrent_requests` and a shared "next allowed start" instant used
//! when a minimum delay between requests is configured. Both single-response
//! and streaming calls pass through the same admission prelude; streams are
//! only retried before their first delta is produced.

mod lease;
mod options;
mod stream;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use rand::Rng;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub use options::{ResilienceOptions, RetryPredicate};

use self::lease::CallLease;
use crate::error::LlmError;
use crate::hooks::{CallContext, HookNotifier};
use crate::provider::DeltaStream;
use crate::types::ChatDelta;

/// Stand-in for instants past what the clock can represent
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Wraps provider calls with retries, admission control and rate limiting
pub struct ResilienceExecutor {
    options: ResilienceOptions,
    gate: Arc<Semaphore>,
    next_allowed: Mutex<Option<Instant>>,
    notifier: Arc<HookNotifier>,
}

impl ResilienceExecutor {
    pub fn new(options: ResilienceOptions, notifier: Arc<HookNotifier>) -> Self {
        let permits = options.max_concurrent_requests.clamp(1, Semaphore::MAX_PERMITS);

        Self {
            options,
            gate: Arc::new(Semaphore::new(permits)),
            next_allowed: Mutex::new(None),
            notifier,
        }
    }

    pub const fn options(&self) -> &ResilienceOptions {
        &self.options
    }

    /// Run a single-response operation
    ///
    /// `operation` is invoked once per attempt. Hooks see one start and one
    /// end-or-error for the whole call; the caller gets the last error as is.
    /// Dropping the returned future reports [`LlmError::Cancelled`] to hooks.
    pub async fn execute<T, F, Fut>(
        &self,
        ctx: &CallContext,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        self.notifier.start(ctx).await;
        let mut lease = CallLease::new(Arc::clone(&self.notifier), ctx.clone());

        let result = match self.admit(cancel).await {
            Ok(permit) => {
                lease.hold(permit);
                self.run_attempts(ctx, cancel, &mut operation).await
            }
            Err(e) => Err(e),
        };

        match &result {
            Ok(_) => lease.succeed().await,
            Err(e) => lease.fail(e).await,
        }

        result
    }

    /// Run a streaming operation
    ///
    /// Each attempt opens the stream and pulls its first delta under the
    /// attempt deadline. Failures up to that point are retried; afterwards
    /// the stream is committed and later errors are yielded to the caller.
    /// The admission slot is held until the terminal delta, an error, or the
    /// returned stream is dropped.
    pub async fn execute_stream<F, Fut>(
        &self,
        ctx: CallContext,
        cancel: CancellationToken,
        mut open: F,
    ) -> Result<DeltaStream, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<DeltaStream, LlmError>>,
    {
        self.notifier.start(&ctx).await;
        let mut lease = CallLease::new(Arc::clone(&self.notifier), ctx.clone());

        match self.admit(&cancel).await {
            Ok(permit) => lease.hold(permit),
            Err(e) => {
                lease.fail(&e).await;
                return Err(e);
            }
        }

        let mut attempt = 0;
        let (first, rest) = loop {
            let opened = self.attempt(&cancel, first_delta(open())).await;

            match opened {
                Ok(opened) => break opened,
                Err(error) => {
                    let Some(delay) = self.retry_delay(&ctx, &cancel, attempt, &error) else {
                        lease.fail(&error).await;
                        return Err(error);
                    };
                    if !back_off(&cancel, delay).await {
                        lease.fail(&LlmError::Cancelled).await;
                        return Err(LlmError::Cancelled);
                    }
                    attempt += 1;
                }
            }
        };

        match first {
            Some(first) => Ok(stream::committed(first, rest, lease, cancel)),
            None => {
                lease.succeed().await;
                Ok(Box::pin(futures_util::stream::empty()))
            }
        }
    }

    /// Acquire a gate slot, then wait out the minimum start spacing
    async fn admit(&self, cancel: &CancellationToken) -> Result<OwnedSemaphorePermit, LlmError> {
        let permit = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(LlmError::Cancelled),
            permit = Arc::clone(&self.gate).acquire_owned() => {
                permit.map_err(|_| LlmError::Internal("admission gate closed".to_owned()))?
            }
        };

        if let Some(min_delay) = self.options.min_delay_between_requests {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(LlmError::Cancelled),
                () = self.pace(min_delay) => {}
            }
        }

        Ok(permit)
    }

    async fn pace(&self, min_delay: Duration) {
        // Held across the sleep so concurrent callers queue behind each other
        let mut next_allowed = self.next_allowed.lock().await;

        if let Some(at) = *next_allowed {
            let wait = at.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                tracing::debug!(wait_ms = wait.as_millis(), "rate limit delay before dispatch");
                tokio::time::sleep_until(at).await;
            }
        }

        let now = Instant::now();
        *next_allowed = Some(now.checked_add(min_delay).unwrap_or_else(|| now + FAR_FUTURE));
    }

    async fn run_attempts<T, F, Fut>(
        &self,
        ctx: &CallContext,
        cancel: &CancellationToken,
        operation: &mut F,
    ) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let mut attempt = 0;

        loop {
            let error = match self.attempt(cancel, operation()).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            let Some(delay) = self.retry_delay(ctx, cancel, attempt, &error) else {
                return Err(error);
            };
            if !back_off(cancel, delay).await {
                return Err(LlmError::Cancelled);
            }
            attempt += 1;
        }
    }

    /// One attempt, ended by whichever of caller cancellation or the
    /// attempt deadline fires first
    async fn attempt<T, Fut>(&self, cancel: &CancellationToken, fut: Fut) -> Result<T, LlmError>
    where
        Fut: Future<Output = Result<T, LlmError>>,
    {
        let bounded = async {
            match self.options.request_timeout {
                Some(timeout) => tokio::time::timeout(timeout, fut)
                    .await
                    .unwrap_or_else(|_| Err(LlmError::Timeout { timeout })),
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(LlmError::Cancelled),
            result = bounded => result,
        }
    }

    /// Delay before the next attempt, or `None` when `error` is final
    fn retry_delay(
        &self,
        ctx: &CallContext,
        cancel: &CancellationToken,
        attempt: u32,
        error: &LlmError,
    ) -> Option<Duration> {
        if cancel.is_cancelled() || attempt >= self.options.max_retries || !self.options.should_retry(error) {
            return None;
        }

        let delay = self.backoff(attempt);
        tracing::warn!(
            request_id = %ctx.request_id,
            provider = %ctx.provider_id,
            attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            error = %error,
            "transient provider failure, retrying"
        );
        Some(delay)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.options.base_backoff(attempt);
        if self.options.jitter {
            Duration::try_from_secs_f64(
                base.as_secs_f64() * rand::rng().random_range(0.875..=1.125),
            )
            .unwrap_or(Duration::MAX)
        } else {
            base
        }
    }
}

/// Sleep for `delay`; false if the caller cancelled meanwhile
async fn back_off(cancel: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}

/// Open a stream and pull its first delta
///
/// An error item as the first element fails the attempt, dropping the stream.
async fn first_delta<Fut>(open: Fut) -> Result<(Option<ChatDelta>, DeltaStream), LlmError>
where
    Fut: Future<Output = Result<DeltaStream, LlmError>>,
{
    let mut stream = open.await?;

    match stream.next().await {
        Some(Ok(delta)) => Ok((Some(delta), stream)),
        Some(Err(error)) => Err(error),
        None => Ok((None, stream)),
    }
}
