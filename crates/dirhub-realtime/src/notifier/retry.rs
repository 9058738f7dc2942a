//! Retrying notifier with exponential backoff.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use dirhub_core::config::RetryConfig;
use dirhub_core::error::AppError;
use dirhub_core::result::AppResult;
use dirhub_entity::DirectoryEvent;

use super::Notifier;

/// Exponential backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialBackoff {
    /// Delay before the first retry.
    pub initial: Duration,
    /// Upper bound of any single delay.
    pub max_interval: Duration,
    /// Growth factor per retry.
    pub multiplier: f64,
}

impl ExponentialBackoff {
    /// Build the schedule described by `[notifier.retry]`.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            initial: config.initial_interval(),
            max_interval: config.max_interval(),
            multiplier: config.multiplier.max(1.0),
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.initial.as_secs_f64() * self.multiplier.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_interval.as_secs_f64() {
            self.max_interval
        } else {
            Duration::from_secs_f64(scaled)
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Retries failed publications of the wrapped notifier.
///
/// Gives up after `max_attempts` attempts (`0` retries until cancelled) or
/// as soon as `cancel` fires, returning the last publication error.
#[derive(Debug)]
pub struct RetryNotifier<N> {
    inner: N,
    backoff: ExponentialBackoff,
    max_attempts: u32,
    cancel: CancellationToken,
}

impl<N: Notifier> RetryNotifier<N> {
    /// Wrap `inner` with the given schedule.
    pub fn new(
        inner: N,
        backoff: ExponentialBackoff,
        max_attempts: u32,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner,
            backoff,
            max_attempts,
            cancel,
        }
    }

    /// Wrap `inner` with the policy from `[notifier.retry]`.
    pub fn from_config(inner: N, config: &RetryConfig, cancel: CancellationToken) -> Self {
        Self::new(
            inner,
            ExponentialBackoff::from_config(config),
            config.max_attempts,
            cancel,
        )
    }
}

#[async_trait]
impl<N: Notifier> Notifier for RetryNotifier<N> {
    async fn publish(&self, event: DirectoryEvent) -> AppResult<()> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let err: AppError = match self.inner.publish(event.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };

            if self.max_attempts != 0 && attempt >= self.max_attempts {
                return Err(err);
            }

            let delay = self.backoff.delay(attempt);
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                directory_id = %event.directory.id,
                error = %err,
                "Event publication failed, retrying"
            );

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(err),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
