use std::time::Duration;

use rand::Rng;

/// Bounded attempts with a random pause between them.
///
/// The pause is drawn uniformly from `[min_delay, max_delay]` and only taken
/// *between* attempts, never before the first one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            min_delay,
            max_delay,
        }
    }

    /// Same attempt budget, no waiting. Used by tests and offline replays.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    /// Attempts are 1-based; at least one attempt is always made.
    pub fn attempts(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.max_attempts.max(1)
    }

    /// Pick the pause before the next attempt.
    pub fn next_delay(&self) -> Duration {
        let lo = self.min_delay.min(self.max_delay).as_millis() as u64;
        let hi = self.min_delay.max(self.max_delay).as_millis() as u64;
        if lo == hi {
            return Duration::from_millis(lo);
        }
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }

    /// Sleep before attempt `attempt` (1-based). No-op for the first attempt.
    pub async fn pause_before(&self, attempt: u32) {
        if attempt <= 1 {
            return;
        }
        let delay = self.next_delay();
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis() as u64, attempt, "waiting before retry");
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(3))
    }
}
