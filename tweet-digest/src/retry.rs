//! Bounded exponential-backoff retry for flaky network calls.
//!
//! [`retry_async`] and [`retry_blocking`] share one schedule: the wait before
//! retry `i` (counted from 0) is `base_delay * 2^i`, and after `max_retries`
//! total attempts the last error is handed back unchanged.

use backoff::{backoff::Backoff, ExponentialBackoff};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// `max_retries` counts total attempts. Zero is treated as one attempt.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay,
        }
    }

    /// A single attempt, no retry.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// The waits between consecutive attempts, in order.
    pub fn delays(&self) -> Vec<Duration> {
        let mut schedule = self.schedule();
        (0..self.max_retries - 1)
            .map(|attempt| {
                schedule
                    .next_backoff()
                    .unwrap_or_else(|| self.base_delay * 2u32.saturating_pow(attempt))
            })
            .collect()
    }

    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.base_delay,
            initial_interval: self.base_delay,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: Duration::MAX,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    fn attempts<'a>(&'a self, label: &'a str) -> Attempts<'a> {
        Attempts {
            policy: self,
            label,
            attempt: 0,
            schedule: self.schedule(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

struct Attempts<'a> {
    policy: &'a RetryPolicy,
    label: &'a str,
    attempt: u32,
    schedule: ExponentialBackoff,
}

impl Attempts<'_> {
    /// Records a failed attempt. Returns the wait before the next one, or
    /// `None` once every attempt is used up.
    fn on_failure(&mut self, error: &dyn Display) -> Option<Duration> {
        let attempt = self.attempt;
        self.attempt += 1;
        if self.attempt >= self.policy.max_retries {
            return None;
        }

        let delay = self
            .schedule
            .next_backoff()
            .unwrap_or_else(|| self.policy.base_delay * 2u32.saturating_pow(attempt));
        warn!(
            "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
            self.label,
            self.attempt,
            self.policy.max_retries,
            error,
            delay
        );
        Some(delay)
    }
}

pub async fn retry_async<T, E, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempts = policy.attempts(label);
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => match attempts.on_failure(&e) {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Err(e),
            },
        }
    }
}

pub fn retry_blocking<T, E, F>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
{
    let mut attempts = policy.attempts(label);
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) => match attempts.on_failure(&e) {
                Some(delay) => std::thread::sleep(delay),
                None => return Err(e),
            },
        }
    }
}
