use std::time::Duration;

/// Capped exponential backoff over consecutive cycle failures.
///
/// The n-th consecutive failure waits `base * 2^(n-1)`, never more than `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(30),
            max: Duration::from_secs(300),
        }
    }
}

impl Backoff {
    pub fn delay(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return Duration::ZERO;
        }
        let exponent = (consecutive_failures - 1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

/// Pause between successful cycles: a fixed floor plus a jitter span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollInterval {
    pub floor: Duration,
    pub jitter: Duration,
}

impl Default for PollInterval {
    fn default() -> Self {
        Self {
            floor: Duration::from_secs(2),
            jitter: Duration::from_secs(1),
        }
    }
}

impl PollInterval {
    /// `fraction` is clamped to `[0, 1]` and selects a point in the jitter span.
    pub fn with_fraction(&self, fraction: f64) -> Duration {
        self.floor + self.jitter.mul_f64(fraction.clamp(0.0, 1.0))
    }
}
