//! Retry/backoff policy shared by readiness contracts and any polling check.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// How often, and how far apart, a predicate is re-evaluated.
///
/// `max_retries` counts retries after the first attempt, so a policy with
/// `max_retries == 0` evaluates exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    #[serde(with = "duration_secs")]
    pub delay: Duration,
    /// Growth factor applied per retry (1.0 = fixed delay)
    pub multiplier: f64,
    /// Upper bound for a single delay
    #[serde(with = "duration_secs")]
    pub max_delay: Duration,
    /// Fraction of the delay randomly added or removed, in `[0, 1]`
    pub jitter: f64,
}

impl BackoffPolicy {
    /// Fixed delay between attempts
    #[must_use]
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            multiplier: 1.0,
            max_delay: delay,
            jitter: 0.0,
        }
    }

    /// Exponentially growing delay, capped at `max_delay`
    #[must_use]
    pub fn exponential(max_retries: u32, initial: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            delay: initial,
            multiplier: 2.0,
            max_delay,
            jitter: 0.0,
        }
    }

    /// Single attempt, no retries
    #[must_use]
    pub fn once() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Total number of evaluations this policy allows.
    #[inline]
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let cap = self.max_delay.max(self.delay);
        let growth = self.multiplier.max(1.0).powi(exp);
        let base = Duration::try_from_secs_f64(self.delay.as_secs_f64() * growth)
            .map_or(cap, |d| d.min(cap));

        if self.jitter > 0.0 && !base.is_zero() {
            let factor = rand::rng().random_range(1.0 - self.jitter..=1.0 + self.jitter);
            Duration::try_from_secs_f64(base.as_secs_f64() * factor).unwrap_or(base)
        } else {
            base
        }
    }

    /// Sum of all delays the policy can incur, ignoring jitter.
    #[must_use]
    pub fn total_delay(&self) -> Duration {
        let unjittered = Self {
            jitter: 0.0,
            ..*self
        };
        (1..=self.max_retries).map(|a| unjittered.delay_for(a)).sum()
    }

    /// Evaluate `probe` until it yields `Ok(true)` or attempts run out.
    ///
    /// `Ok(false)` and `Err(_)` both count as a failed attempt. No overall
    /// deadline is applied here; callers wrap this in their own timeout.
    pub async fn poll_until<F, Fut, E>(&self, mut probe: F) -> PollOutcome<E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<bool, E>>,
    {
        let mut last_error = None;

        for attempt in 1..=self.max_attempts() {
            match probe(attempt).await {
                Ok(true) => {
                    return PollOutcome {
                        satisfied: true,
                        attempts: attempt,
                        last_error: None,
                    };
                }
                Ok(false) => {
                    tracing::trace!(attempt, "probe not yet satisfied");
                }
                Err(e) => {
                    tracing::trace!(attempt, "probe returned an error");
                    last_error = Some(e);
                }
            }

            if attempt < self.max_attempts() {
                sleep(self.delay_for(attempt)).await;
            }
        }

        PollOutcome {
            satisfied: false,
            attempts: self.max_attempts(),
            last_error,
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(1))
    }
}

/// Result of [`BackoffPolicy::poll_until`]
#[derive(Debug)]
pub struct PollOutcome<E> {
    pub satisfied: bool,
    pub attempts: u32,
    /// Error from the most recent failing attempt that returned one
    pub last_error: Option<E>,
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn fixed_policy_has_constant_delay() {
        let p = BackoffPolicy::fixed(3, Duration::from_millis(200));
        assert_eq!(p.max_attempts(), 4);
        assert_eq!(p.delay_for(1), Duration::from_millis(200));
        assert_eq!(p.delay_for(3), Duration::from_millis(200));
        assert_eq!(p.total_delay(), Duration::from_millis(600));
    }

    #[test]
    fn exponential_policy_is_capped() {
        let p = BackoffPolicy::exponential(5, Duration::from_millis(100), Duration::from_millis(350));
        assert_eq!(p.delay_for(1), Duration::from_millis(100));
        assert_eq!(p.delay_for(2), Duration::from_millis(200));
        assert_eq!(p.delay_for(3), Duration::from_millis(350));
        assert_eq!(p.delay_for(5), Duration::from_millis(350));
    }

    #[test]
    fn huge_growth_saturates_at_cap() {
        let p = BackoffPolicy::exponential(u32::MAX, Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(p.delay_for(2_000), Duration::from_secs(30));
        assert_eq!(p.delay_for(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn jitter_stays_within_spread() {
        let p = BackoffPolicy::fixed(1, Duration::from_millis(1000)).with_jitter(0.1);
        for _ in 0..100 {
            let d = p.delay_for(1);
            assert!(d >= Duration::from_millis(900) && d <= Duration::from_millis(1100));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn poll_stops_on_first_success() {
        let calls = Cell::new(0);
        let p = BackoffPolicy::fixed(5, Duration::from_millis(10));
        let outcome = p
            .poll_until(|attempt| {
                calls.set(calls.get() + 1);
                async move { Ok::<_, ()>(attempt == 3) }
            })
            .await;
        assert!(outcome.satisfied);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn poll_exhausts_and_keeps_last_error() {
        let p = BackoffPolicy::fixed(2, Duration::from_millis(10));
        let outcome = p
            .poll_until(|attempt| async move {
                if attempt == 1 {
                    Err(format!("boom {attempt}"))
                } else {
                    Ok(false)
                }
            })
            .await;
        assert!(!outcome.satisfied);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.last_error.as_deref(), Some("boom 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_single_attempt() {
        let calls = Cell::new(0);
        let outcome = BackoffPolicy::once()
            .poll_until(|_| {
                calls.set(calls.get() + 1);
                async { Ok::<_, ()>(false) }
            })
            .await;
        assert!(!outcome.satisfied);
        assert_eq!(calls.get(), 1);
    }
}
