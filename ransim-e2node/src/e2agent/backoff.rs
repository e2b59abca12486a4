//! Exponential backoff for dial and setup retries.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use ransim_common::{Error, Result};

/// Retry policy. Retries never give up on their own; only cancellation stops them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// First delay
    pub initial: Duration,
    /// Upper bound for a single delay
    pub max: Duration,
    /// Growth factor applied after each attempt
    pub multiplier: f64,
    /// Relative jitter, 0.5 spreads a delay over [0.5d, 1.5d]
    pub randomization: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(10),
            max: Duration::from_secs(5),
            multiplier: 1.5,
            randomization: 0.5,
        }
    }
}

/// Delay sequence produced from a [`BackoffConfig`].
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    current: Duration,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            current: config.initial,
        }
    }

    /// Returns the next delay (jittered, capped at `max`) and grows the interval.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.current;
        let next = base.mul_f64(self.config.multiplier.max(1.0));
        self.current = next.min(self.config.max);

        let r = self.config.randomization.clamp(0.0, 1.0);
        let delay = if r > 0.0 {
            base.mul_f64(rand::thread_rng().gen_range(1.0 - r..=1.0 + r))
        } else {
            base
        };
        delay.min(self.config.max)
    }

    pub fn reset(&mut self) {
        self.current = self.config.initial;
    }
}

/// Runs `op` until it succeeds, sleeping between attempts.
///
/// Returns `Error::Unknown` only when `shutdown` is cancelled first.
pub async fn retry_forever<T, F, Fut>(
    what: &str,
    config: BackoffConfig,
    shutdown: &CancellationToken,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff = Backoff::new(config);
    let mut attempt: u64 = 0;
    loop {
        let result = tokio::select! {
            _ = shutdown.cancelled() => return Err(Error::Unknown(format!("{what} cancelled"))),
            result = op() => result,
        };
        match result {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                let delay = backoff.next_delay();
                warn!("failed to {}: {}; retry after {:?}; attempt {}", what, e, delay, attempt);
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        return Err(Error::Unknown(format!("{what} cancelled")));
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}
