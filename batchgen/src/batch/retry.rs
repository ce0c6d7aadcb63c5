//! Retry and pacing policy for batch runs.

use crate::error::{EngineError, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Delay before retry attempt `n + 1`, given `n` failed attempts so far.
#[derive(Clone)]
pub enum Backoff {
    /// Same wait after every failure
    Fixed(Duration),
    /// `step * failures`: 10s, 20s, 30s... for a 10s step
    Progressive { step: Duration },
    /// Explicit waits; the last entry repeats once the list runs out
    Schedule(Vec<Duration>),
    /// Caller-supplied function of the failure count
    Custom(Arc<dyn Fn(u32) -> Duration + Send + Sync>),
}

impl Backoff {
    /// Wait to apply after the `failures`-th failed attempt (1-based).
    pub fn delay(&self, failures: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Progressive { step } => step.saturating_mul(failures),
            Self::Schedule(steps) => steps
                .get(failures.saturating_sub(1) as usize)
                .or(steps.last())
                .copied()
                .unwrap_or(Duration::ZERO),
            Self::Custom(f) => f(failures),
        }
    }

    /// Wrap a closure as a backoff function.
    pub fn custom(f: impl Fn(u32) -> Duration + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }
}

impl fmt::Debug for Backoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(delay) => f.debug_tuple("Fixed").field(delay).finish(),
            Self::Progressive { step } => f.debug_struct("Progressive").field("step", step).finish(),
            Self::Schedule(steps) => f.debug_tuple("Schedule").field(steps).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Bounded retry for a single batch item.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per item, including the first
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::simple()
    }
}

impl RetryPolicy {
    /// Three attempts with a short fixed pause, for ordinary batches.
    pub fn simple() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Fixed(Duration::from_millis(1500)),
        }
    }

    /// Three attempts waiting 10s, then 20s, for rate-limited providers.
    pub fn rate_limited() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Progressive {
                step: Duration::from_secs(10),
            },
        }
    }

    /// Retry without waiting.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed(Duration::ZERO),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(EngineError::invalid("max_attempts must be at least 1"));
        }
        Ok(())
    }
}

/// Options for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub retry: RetryPolicy,
    /// Pause between consecutive items, separate from retry backoff
    pub inter_item_delay: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            inter_item_delay: Duration::from_secs(1),
        }
    }
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_inter_item_delay(mut self, delay: Duration) -> Self {
        self.inter_item_delay = delay;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.retry.validate()
    }
}
