//! Cooldown policy for disabled credentials
//!
//! A credential that crosses the failure threshold is disabled for
//! `cooldown(excess)`, where `excess` is the number of consecutive failures
//! beyond the threshold. The curve never decreases as failures accumulate.

use std::time::Duration;

/// Cooldown curve: `min(base * multiplier^excess, max)`
#[derive(Debug, Clone, PartialEq)]
pub struct CooldownPolicy {
    /// Cooldown applied when the threshold is first reached
    pub base: Duration,
    /// Growth factor per additional failure (>= 1.0)
    pub multiplier: f64,
    /// Upper bound on any single cooldown
    pub max: Duration,
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self::exponential(Duration::from_secs(60), 2.0, Duration::from_secs(1800))
    }
}

impl CooldownPolicy {
    /// Constant cooldown regardless of failure count
    pub fn fixed(duration: Duration) -> Self {
        Self {
            base: duration,
            multiplier: 1.0,
            max: duration,
        }
    }

    /// Exponential cooldown capped at `max`
    ///
    /// Multipliers below 1.0 are clamped to 1.0.
    pub fn exponential(base: Duration, multiplier: f64, max: Duration) -> Self {
        Self {
            base,
            multiplier: if multiplier.is_finite() && multiplier >= 1.0 {
                multiplier
            } else {
                1.0
            },
            max,
        }
    }

    /// Cooldown for the given number of failures past the threshold
    pub fn cooldown(&self, excess: u32) -> Duration {
        let exponent = excess.min(i32::MAX as u32) as i32;
        let secs = self.base.as_secs_f64() * self.multiplier.powi(exponent);
        let max_secs = self.max.as_secs_f64();

        if !secs.is_finite() || secs >= max_secs {
            return self.max;
        }
        Duration::from_secs_f64(secs)
    }
}
