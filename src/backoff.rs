//! Bounded exponential backoff schedules for transport retries.
//!
//! A [`BackoffPolicy`] is computed once at the start of a retry session via
//! [`compute_schedule`] and is immutable afterwards. Besides the per-retry
//! delays it carries a worst-case `max_elapsed_time`, so a caller can size an
//! outer timeout that every configured retry is guaranteed to fit into.
//!
//! # Delay Calculation
//!
//! ```text
//! interval(0) = initial_interval
//! interval(n) = min(interval(n - 1) * multiplier, max_interval)
//! delay(n)    = interval(n) * (1 + jitter_factor * r),  r uniform in [-1, 1]
//! ```
//!
//! `max_elapsed_time` sums `interval(0..max_retries)`, inflates the sum by
//! `(1 + jitter_factor)` and clamps it to [`MAX_ELAPSED_CEILING`].
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use artifact_core::backoff::compute_schedule;
//!
//! let policy = compute_schedule(Duration::from_millis(200), 5).unwrap();
//! assert_eq!(policy.max_retries(), 5);
//! // 200 + 400 + 800 + 1600 + 3200 = 6200ms, plus 20% jitter headroom
//! assert_eq!(policy.max_elapsed_time(), Duration::from_millis(7440));
//! ```

use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tracing::debug;

/// Interval substituted when the caller passes a zero initial interval.
pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);

/// Largest accepted initial interval.
pub const MAX_INITIAL_INTERVAL: Duration = Duration::from_secs(10);

/// Per-retry interval cap.
pub const MAX_INTERVAL: Duration = Duration::from_secs(30);

/// Interval growth factor per retry.
pub const MULTIPLIER: f64 = 2.0;

/// Fractional randomization applied to each delay.
pub const JITTER_FACTOR: f64 = 0.2;

/// Absolute ceiling for the total time a retry session may take (12 hours).
pub const MAX_ELAPSED_CEILING: Duration = Duration::from_secs(12 * 60 * 60);

/// Smallest accepted retry count.
pub const MIN_RETRIES: u32 = 1;

/// Largest accepted retry count.
pub const MAX_RETRIES: u32 = 100;

/// Invalid backoff parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackoffError {
    /// Retry count outside `[MIN_RETRIES, MAX_RETRIES]`.
    #[error("invalid max retries {value}: must be between {MIN_RETRIES} and {MAX_RETRIES}")]
    InvalidMaxRetries {
        /// The rejected retry count.
        value: u32,
    },

    /// Initial interval outside `(0, MAX_INITIAL_INTERVAL]`.
    #[error("invalid initial interval {value:?}: must be greater than zero and at most 10s")]
    InvalidInitialInterval {
        /// The rejected interval.
        value: Duration,
    },

    /// Multiplier outside `(1.0, 10.0]`.
    #[error("invalid backoff multiplier {value}: must be greater than 1.0 and at most 10.0")]
    InvalidMultiplier {
        /// The rejected multiplier.
        value: f64,
    },

    /// Jitter factor outside `[0.0, 1.0)`.
    #[error("invalid jitter factor {value}: must be at least 0.0 and below 1.0")]
    InvalidJitterFactor {
        /// The rejected jitter factor.
        value: f64,
    },
}

/// Immutable exponential backoff schedule for one retry session.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    initial_interval: Duration,
    max_interval: Duration,
    multiplier: f64,
    jitter_factor: f64,
    max_retries: u32,
    max_elapsed_time: Duration,
}

/// Computes a backoff schedule that completes `max_retries` retries within
/// a bounded total time.
///
/// `max_retries` is clamped into `[MIN_RETRIES, MAX_RETRIES]`. A zero
/// `initial_interval` is replaced by [`DEFAULT_INITIAL_INTERVAL`].
///
/// # Errors
///
/// Returns [`BackoffError::InvalidInitialInterval`] when `initial_interval`
/// exceeds [`MAX_INITIAL_INTERVAL`].
pub fn compute_schedule(
    initial_interval: Duration,
    max_retries: u32,
) -> Result<BackoffPolicy, BackoffError> {
    let max_retries = max_retries.clamp(MIN_RETRIES, MAX_RETRIES);
    let initial_interval = if initial_interval.is_zero() {
        DEFAULT_INITIAL_INTERVAL
    } else {
        initial_interval
    };

    let max_elapsed_time = max_elapsed_time(
        initial_interval,
        MAX_INTERVAL,
        MULTIPLIER,
        JITTER_FACTOR,
        max_retries,
    )?;

    debug!(
        initial_ms = initial_interval.as_millis(),
        max_retries,
        max_elapsed_ms = max_elapsed_time.as_millis(),
        "computed backoff schedule"
    );

    Ok(BackoffPolicy {
        initial_interval,
        max_interval: MAX_INTERVAL,
        multiplier: MULTIPLIER,
        jitter_factor: JITTER_FACTOR,
        max_retries,
        max_elapsed_time,
    })
}

/// Worst-case total wait across `max_retries` retries.
fn max_elapsed_time(
    initial_interval: Duration,
    max_interval: Duration,
    multiplier: f64,
    jitter_factor: f64,
    max_retries: u32,
) -> Result<Duration, BackoffError> {
    if !(MIN_RETRIES..=MAX_RETRIES).contains(&max_retries) {
        return Err(BackoffError::InvalidMaxRetries { value: max_retries });
    }
    if initial_interval.is_zero() || initial_interval > MAX_INITIAL_INTERVAL {
        return Err(BackoffError::InvalidInitialInterval {
            value: initial_interval,
        });
    }
    if !(multiplier > 1.0 && multiplier <= 10.0) {
        return Err(BackoffError::InvalidMultiplier { value: multiplier });
    }
    if !(0.0..1.0).contains(&jitter_factor) {
        return Err(BackoffError::InvalidJitterFactor {
            value: jitter_factor,
        });
    }

    let mut interval = initial_interval;
    let mut sum = interval;
    for _ in 1..max_retries {
        interval = scale(interval, multiplier).min(max_interval);
        sum += interval;
    }

    Ok(scale(sum, 1.0 + jitter_factor).min(MAX_ELAPSED_CEILING))
}

/// Multiplies a duration by `factor`, rounding to the nearest nanosecond.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn scale(duration: Duration, factor: f64) -> Duration {
    let nanos = (duration.as_nanos() as f64 * factor).round().max(0.0);
    Duration::from_nanos(nanos as u64)
}

impl BackoffPolicy {
    /// Interval before the first retry.
    #[must_use]
    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    /// Per-retry interval cap.
    #[must_use]
    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// Growth factor per retry.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Fractional randomization applied to each delay.
    #[must_use]
    pub fn jitter_factor(&self) -> f64 {
        self.jitter_factor
    }

    /// Number of retries after the initial attempt.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Upper bound on the summed delays of a full retry session.
    #[must_use]
    pub fn max_elapsed_time(&self) -> Duration {
        self.max_elapsed_time
    }

    /// Un-randomized interval before retry `retry` (0-indexed).
    #[must_use]
    pub fn interval_for(&self, retry: u32) -> Duration {
        let mut interval = self.initial_interval;
        for _ in 0..retry.min(self.max_retries) {
            interval = scale(interval, self.multiplier).min(self.max_interval);
        }
        interval
    }

    /// Randomized delay before retry `retry` (0-indexed).
    ///
    /// Always within `interval_for(retry) * (1 ± jitter_factor)`.
    #[must_use]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let interval = self.interval_for(retry);
        if self.jitter_factor == 0.0 {
            return interval;
        }
        let spread = rand::thread_rng().gen_range(-self.jitter_factor..=self.jitter_factor);
        scale(interval, 1.0 + spread)
    }
}
