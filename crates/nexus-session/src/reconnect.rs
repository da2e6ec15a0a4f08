//! Reconnect policy for dropped sessions.
//!
//! The channel itself never reconnects. When a session observes its channel
//! close unexpectedly it consults this policy, and the driving event loop
//! performs the delayed re-open. Exhausting the attempt budget leaves the
//! session `Closed` until the user reconnects manually.

use std::time::Duration;

use nexus_types::ReconnectConfig;

/// Capped exponential backoff over a bounded number of attempts.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Maximum attempts before giving up. Zero disables reconnection.
    max_attempts: u32,
    /// Delay for the first attempt; doubles on each subsequent one.
    base_delay: Duration,
    /// Upper bound on the delay.
    max_delay: Duration,
    /// Attempts consumed in the current cycle.
    attempt: u32,
}

impl ReconnectPolicy {
    /// Create a policy with explicit tuning.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            attempt: 0,
        }
    }

    /// Build a policy from configuration.
    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self::new(
            config.max_attempts,
            config.base_delay(),
            config.max_delay(),
        )
    }

    /// A policy that never reconnects: a dropped session stays `Closed`.
    pub fn disabled() -> Self {
        Self::new(0, Duration::from_millis(500), Duration::from_millis(500))
    }

    /// Consume one attempt and return the delay to wait before it, or `None`
    /// when the budget is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_attempts {
            return None;
        }
        self.attempt += 1;
        // Shift capped well below u32 range; the min() below bounds the rest.
        let exponent = (self.attempt - 1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        Some(delay.min(self.max_delay))
    }

    /// Attempts consumed in the current cycle.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Start a fresh cycle after a successful handshake.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_until_cap() {
        let mut policy = ReconnectPolicy::new(
            5,
            Duration::from_millis(500),
            Duration::from_millis(3_000),
        );

        assert_eq!(policy.next_delay(), Some(Duration::from_millis(500)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(1_000)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(2_000)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(3_000)));
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(3_000)));
        assert_eq!(policy.next_delay(), None);
        assert_eq!(policy.attempt(), 5);
    }

    #[test]
    fn disabled_policy_never_retries() {
        let mut policy = ReconnectPolicy::disabled();
        assert_eq!(policy.next_delay(), None);
        assert_eq!(policy.attempt(), 0);
    }

    #[test]
    fn reset_restores_budget() {
        let mut policy =
            ReconnectPolicy::new(2, Duration::from_millis(100), Duration::from_secs(1));
        policy.next_delay();
        policy.next_delay();
        assert_eq!(policy.next_delay(), None);

        policy.reset();
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn from_config_uses_tuning() {
        let config = ReconnectConfig {
            max_attempts: 1,
            base_delay_ms: 250,
            max_delay_ms: 250,
        };
        let mut policy = ReconnectPolicy::from_config(&config);
        assert_eq!(policy.next_delay(), Some(Duration::from_millis(250)));
        assert_eq!(policy.next_delay(), None);
    }
}
