//! Delay before a failed job runs again.

use chrono::Duration;
use rand::Rng;

use crate::config::{BackoffCurve, SyncConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub curve: BackoffCurve,
    pub base_seconds: u64,
    pub max_seconds: u64,
    /// Fraction of the delay added at random, `0.0..=1.0`.
    pub jitter_factor: f64,
}

impl RetryPolicy {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            curve: config.backoff,
            base_seconds: config.retry_base_seconds,
            max_seconds: config.retry_max_seconds,
            jitter_factor: config.jitter_factor,
        }
    }

    /// Same policy with a different base, as set on the settings row.
    pub fn with_base_seconds(mut self, base_seconds: u64) -> Self {
        self.base_seconds = base_seconds.max(1);
        self
    }

    /// Delay without jitter for a job that has failed `retry_count` times before.
    pub fn base_delay_seconds(&self, retry_count: u32) -> u64 {
        let raw = match self.curve {
            BackoffCurve::Linear => self
                .base_seconds
                .saturating_mul(u64::from(retry_count) + 1),
            BackoffCurve::Exponential => {
                let factor = 1u64.checked_shl(retry_count).unwrap_or(u64::MAX);
                self.base_seconds.saturating_mul(factor)
            }
        };
        raw.min(self.max_seconds)
    }

    pub fn delay(&self, retry_count: u32) -> Duration {
        self.delay_with_rng(retry_count, &mut rand::thread_rng())
    }

    pub fn delay_with_rng<R: Rng + ?Sized>(&self, retry_count: u32, rng: &mut R) -> Duration {
        let base = self.base_delay_seconds(retry_count);
        let factor = self.jitter_factor.clamp(0.0, 1.0);
        let jitter = if factor == 0.0 {
            0
        } else {
            (base as f64 * rng.gen_range(0.0..=factor)).round() as u64
        };
        let seconds = base.saturating_add(jitter).min(self.max_seconds);
        Duration::seconds(i64::try_from(seconds).unwrap_or(i64::MAX / 1_000))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn policy(curve: BackoffCurve) -> RetryPolicy {
        RetryPolicy {
            curve,
            base_seconds: 300,
            max_seconds: 3600,
            jitter_factor: 0.0,
        }
    }

    #[test]
    fn linear_grows_by_base_each_retry() {
        let policy = policy(BackoffCurve::Linear);
        assert_eq!(policy.base_delay_seconds(0), 300);
        assert_eq!(policy.base_delay_seconds(1), 600);
        assert_eq!(policy.base_delay_seconds(2), 900);
        assert_eq!(policy.base_delay_seconds(20), 3600);
    }

    #[test]
    fn exponential_doubles_and_caps() {
        let policy = policy(BackoffCurve::Exponential);
        assert_eq!(policy.base_delay_seconds(0), 300);
        assert_eq!(policy.base_delay_seconds(1), 600);
        assert_eq!(policy.base_delay_seconds(2), 1200);
        assert_eq!(policy.base_delay_seconds(4), 3600);
        assert_eq!(policy.base_delay_seconds(200), 3600);
    }

    #[test]
    fn jitter_stays_within_factor_and_cap() {
        let mut policy = policy(BackoffCurve::Linear);
        policy.jitter_factor = 0.5;
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..100 {
            let delay = policy.delay_with_rng(0, &mut rng).num_seconds();
            assert!((300..=450).contains(&delay), "{delay}");
        }
        for _ in 0..100 {
            let delay = policy.delay_with_rng(10, &mut rng).num_seconds();
            assert_eq!(delay, 3600);
        }
    }

    #[test]
    fn defaults_are_linear_with_hour_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.curve, BackoffCurve::Linear);
        assert_eq!(policy.max_seconds, 3600);
        assert_eq!(policy.delay(0), Duration::seconds(300));
    }
}
