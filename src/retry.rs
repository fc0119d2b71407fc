//! Per-node retry policies.
//!
//! A node registered with a [`RetryPolicy`] is re-invoked when it fails with
//! [`NodeError::Retryable`](crate::node::NodeError::Retryable), up to
//! `max_attempts` total invocations, sleeping the backoff delay between
//! attempts. Suspensions and other errors are never retried.

use std::time::Duration;

use rand::Rng;

/// Backoff schedule between retry attempts.
#[derive(Clone, Debug, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed(Duration),
    /// `base * factor^(attempt-1)`, capped at `max`.
    Exponential {
        base: Duration,
        factor: f64,
        max: Duration,
    },
}

/// Retry policy attached to a node at registration time.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use stepflow::retry::RetryPolicy;
///
/// // A single attempt, no retries (the default).
/// let once = RetryPolicy::once();
/// assert_eq!(once.max_attempts, 1);
///
/// // Three attempts with exponential backoff from 100ms.
/// let policy = RetryPolicy::exponential(3, Duration::from_millis(100));
/// assert_eq!(policy.max_attempts, 3);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total invocations allowed, including the first.
    pub max_attempts: u32,
    /// Delay schedule between attempts.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// One attempt, no retries.
    #[must_use]
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            backoff: Backoff::Fixed(Duration::ZERO),
        }
    }

    /// `max_attempts` total invocations with a fixed delay between them.
    #[must_use]
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Fixed(delay),
        }
    }

    /// `max_attempts` total invocations with exponential backoff, doubling
    /// from `base` and capped at 30 seconds.
    #[must_use]
    pub fn exponential(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Exponential {
                base,
                factor: 2.0,
                max: Duration::from_secs(30),
            },
        }
    }

    /// Delay to sleep before the given retry attempt (the attempt that just
    /// failed, 1-based), with up to 10% random jitter added.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let base = match &self.backoff {
            Backoff::Fixed(d) => *d,
            Backoff::Exponential { base, factor, max } => {
                let exp = factor.powi(attempt.saturating_sub(1) as i32);
                let scaled = base.as_secs_f64() * exp;
                Duration::from_secs_f64(scaled.min(max.as_secs_f64()))
            }
        };
        if base.is_zero() {
            return base;
        }
        let jitter = rand::rng().random_range(0.0..=0.1);
        base.mul_f64(1.0 + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::once()
    }
}
