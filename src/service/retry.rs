use super::config::ScoringConfig;
use std::time::Duration;

/// Bounded exponential backoff for transient storage failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ScoringConfig) -> Self {
        Self {
            max_attempts: config.storage_max_attempts.max(1),
            initial_delay: config.storage_retry_delay(),
            max_delay: config.storage_retry_max_delay(),
            multiplier: 2.0,
        }
    }

    /// Delay before attempt number `attempt` (1-based). The first attempt never waits.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let delay = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32 - 2);
        let delay = delay.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(delay as u64)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
