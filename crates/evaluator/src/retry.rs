//! Bounded retry with exponential backoff for external collaborators.

use std::fmt::Display;
use std::future::Future;
use std::thread;
use std::time::Duration;

/// Retry budget for a single collaborator call.
///
/// The delay after failed attempt `n` (1-based) is
/// `initial_backoff * 2^(n-1)`, capped at `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
            max_backoff,
        }
    }

    /// Retries without sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1_u32
            .checked_shl(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Runs `op` until it succeeds or the attempt budget is spent, sleeping
    /// between attempts. Returns the last error on exhaustion.
    pub fn run<T, E, F>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Result<T, E>,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(self.succeeded(operation, attempt, value)),
                Err(err) => match self.after_failure(operation, attempt, &err, true) {
                    Some(delay) => {
                        if !delay.is_zero() {
                            thread::sleep(delay);
                        }
                        attempt += 1;
                    }
                    None => return Err(err),
                },
            }
        }
    }

    /// Async form of [`run`](Self::run). Only errors accepted by `retryable`
    /// are retried; `sleep` supplies the runtime's timer.
    pub async fn run_async<T, E, F, Fut, R, S, SleepFut>(
        &self,
        operation: &str,
        mut op: F,
        retryable: R,
        sleep: S,
    ) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        R: Fn(&E) -> bool,
        S: Fn(Duration) -> SleepFut,
        SleepFut: Future<Output = ()>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(self.succeeded(operation, attempt, value)),
                Err(err) => match self.after_failure(operation, attempt, &err, retryable(&err)) {
                    Some(delay) => {
                        if !delay.is_zero() {
                            sleep(delay).await;
                        }
                        attempt += 1;
                    }
                    None => return Err(err),
                },
            }
        }
    }

    fn succeeded<T>(&self, operation: &str, attempt: u32, value: T) -> T {
        if attempt > 1 {
            tracing::debug!(operation, attempt, "operation succeeded after retry");
        }
        value
    }

    /// Logs a failed attempt and returns the delay before the next one, or
    /// `None` when the error should be returned.
    fn after_failure<E: Display>(
        &self,
        operation: &str,
        attempt: u32,
        err: &E,
        retryable: bool,
    ) -> Option<Duration> {
        if !retryable {
            tracing::debug!(operation, attempt, error = %err, "error is not retryable");
            return None;
        }
        if attempt >= self.max_attempts {
            tracing::warn!(operation, attempt, error = %err, "retry budget exhausted");
            return None;
        }
        let delay = self.backoff(attempt);
        tracing::warn!(
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "attempt failed, backing off"
        );
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
        assert_eq!(policy.backoff(4), Duration::from_millis(500));
        assert_eq!(policy.backoff(60), Duration::from_millis(500));
    }

    #[test]
    fn run_retries_until_success() {
        let mut calls = 0;
        let result: Result<u32, String> = RetryPolicy::immediate(3).run("flaky", || {
            calls += 1;
            if calls < 3 {
                Err(format!("failure {calls}"))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn run_returns_last_error_when_exhausted() {
        let mut calls = 0;
        let result: Result<(), String> = RetryPolicy::immediate(2).run("down", || {
            calls += 1;
            Err(format!("failure {calls}"))
        });
        assert_eq!(result, Err("failure 2".to_string()));
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn run_async_retries_only_retryable_errors() {
        let counter = std::cell::Cell::new(0);
        let calls = &counter;
        let result: Result<u32, String> = RetryPolicy::immediate(3)
            .run_async(
                "flaky",
                || async move {
                    calls.set(calls.get() + 1);
                    if calls.get() < 3 {
                        Err("busy".to_string())
                    } else {
                        Ok(calls.get())
                    }
                },
                |err: &String| err == "busy",
                tokio::time::sleep,
            )
            .await;
        assert_eq!(result, Ok(3));

        calls.set(0);
        let result: Result<(), String> = RetryPolicy::immediate(3)
            .run_async(
                "rejected",
                || async move {
                    calls.set(calls.get() + 1);
                    Err("unauthorized".to_string())
                },
                |err: &String| err == "busy",
                tokio::time::sleep,
            )
            .await;
        assert_eq!(result, Err("unauthorized".to_string()));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn at_least_one_attempt_is_made() {
        assert_eq!(RetryPolicy::immediate(0).max_attempts, 1);
    }
}
