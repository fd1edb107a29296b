//! # Backoff policy for bring-up retries.
//!
//! [`BackoffPolicy`] controls how the delay between bring-up attempts grows
//! after repeated failures. It is parameterized by:
//! - [`BackoffPolicy::first`] the delay after the first failure;
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the maximum delay cap.
//!
//! The progression is stateful: the caller keeps the previous *base* delay
//! and feeds it back into [`BackoffPolicy::next`]. Jitter is applied to the
//! slept duration only (see [`BackoffPolicy::jittered`]), so randomness never
//! feeds back into the progression.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use sen5x_bridge::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy::default();
//!
//! let d1 = backoff.next(None);
//! let d2 = backoff.next(Some(d1));
//! let d3 = backoff.next(Some(d2));
//! assert_eq!(d1, Duration::from_secs(5));
//! assert_eq!(d2, Duration::from_secs(10));
//! assert_eq!(d3, Duration::from_secs(20));
//!
//! // Capped at `max`.
//! assert_eq!(backoff.next(Some(Duration::from_secs(200))), Duration::from_secs(300));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Retry backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay after the first failure.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0`).
    pub factor: f64,
    /// Randomization applied to the slept delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a policy with:
    /// - `first = 5s`;
    /// - `factor = 2.0` (doubling);
    /// - `max = 300s`;
    /// - `jitter = None`.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(5),
            max: Duration::from_secs(300),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Computes the next base delay from the previous one.
    ///
    /// - `None` (no failure yet) returns `first`, clamped to `max`.
    /// - `Some(prev)` returns `prev × factor`, clamped to `max`.
    ///
    /// Non-finite or negative intermediate values clamp to `max`.
    pub fn next(&self, prev: Option<Duration>) -> Duration {
        let Some(prev) = prev else {
            return self.first.min(self.max);
        };

        let max_secs = self.max.as_secs_f64();
        let unclamped = prev.as_secs_f64() * self.factor;
        if !unclamped.is_finite() || unclamped < 0.0 || unclamped > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(unclamped)
        }
    }

    /// Applies the configured jitter to a base delay.
    #[inline]
    pub fn jittered(&self, base: Duration) -> Duration {
        self.jitter.apply(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubling(first: u64, max: u64) -> BackoffPolicy {
        BackoffPolicy {
            first: Duration::from_secs(first),
            max: Duration::from_secs(max),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    #[test]
    fn test_first_failure_returns_first() {
        assert_eq!(BackoffPolicy::default().next(None), Duration::from_secs(5));
    }

    #[test]
    fn test_sequence_matches_closed_form() {
        let policy = BackoffPolicy::default();
        let mut prev = None;
        for n in 1..=12u32 {
            let delay = policy.next(prev);
            let expected = (5u64 << (n - 1)).min(300);
            assert_eq!(
                delay,
                Duration::from_secs(expected),
                "failure #{n} should wait min(5 * 2^(n-1), 300)"
            );
            prev = Some(delay);
        }
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let policy = BackoffPolicy::default();
        let mut prev = None;
        let mut last = Duration::ZERO;
        for _ in 0..50 {
            let delay = policy.next(prev);
            assert!(delay >= last);
            last = delay;
            prev = Some(delay);
        }
        assert_eq!(last, Duration::from_secs(300));
    }

    #[test]
    fn test_constant_factor() {
        let policy = BackoffPolicy {
            factor: 1.0,
            ..doubling(7, 300)
        };
        let mut prev = None;
        for _ in 0..10 {
            let delay = policy.next(prev);
            assert_eq!(delay, Duration::from_secs(7));
            prev = Some(delay);
        }
    }

    #[test]
    fn test_first_exceeds_max() {
        let policy = doubling(10, 5);
        assert_eq!(policy.next(None), Duration::from_secs(5));
    }

    #[test]
    fn test_overflow_clamps_to_max() {
        let policy = BackoffPolicy {
            factor: f64::MAX,
            ..doubling(1, 60)
        };
        assert_eq!(
            policy.next(Some(Duration::from_secs(u64::MAX / 2))),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_jitter_never_exceeds_base() {
        let policy = BackoffPolicy {
            jitter: JitterPolicy::Full,
            ..BackoffPolicy::default()
        };
        let base = Duration::from_secs(40);
        for _ in 0..100 {
            assert!(policy.jittered(base) <= base);
        }
    }
}
