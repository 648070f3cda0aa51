use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Retry budget and delay schedule for one leg (primary or fallback) of a
/// request. Delays double from `first_delay_ms` unless `multiplier` says
/// otherwise, and never exceed `delay_cap_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Extra calls allowed after the first, transient failures only.
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_first_delay_ms")]
    pub first_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_delay_cap_ms")]
    pub delay_cap_ms: u64,
}

const fn default_first_delay_ms() -> u64 {
    1_000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_delay_cap_ms() -> u64 {
    30_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::primary()
    }
}

impl RetryPolicy {
    /// Budget for the model the user picked: 3 retries after 1s, 2s, 4s.
    pub fn primary() -> Self {
        Self::doubling(3)
    }

    /// Budget for the one-time fallback model: 2 retries after 1s, 2s.
    pub fn fallback() -> Self {
        Self::doubling(2)
    }

    fn doubling(max_retries: u32) -> Self {
        Self {
            max_retries,
            first_delay_ms: default_first_delay_ms(),
            multiplier: default_multiplier(),
            delay_cap_ms: default_delay_cap_ms(),
        }
    }

    pub fn can_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }

    pub fn retries_remaining(&self, retries_done: u32) -> u32 {
        self.max_retries.saturating_sub(retries_done)
    }

    /// Wait before retry number `retries_done + 1`.
    ///
    /// Zero or negative settings from a config file fall back to the
    /// defaults instead of producing a zero-length or shrinking schedule.
    pub fn backoff_duration(&self, retries_done: u32) -> Duration {
        let first = match self.first_delay_ms {
            0 => default_first_delay_ms(),
            ms => ms,
        };
        let multiplier = if self.multiplier > 0.0 {
            self.multiplier
        } else {
            default_multiplier()
        };
        let scaled = first as f64 * multiplier.powi(retries_done as i32);
        let ms = if scaled.is_finite() { scaled.round() as u64 } else { u64::MAX };
        Duration::from_millis(ms.min(self.delay_cap_ms.max(1)))
    }
}
