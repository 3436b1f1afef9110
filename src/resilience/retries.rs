//! Retry bookkeeping for greeting units.
//!
//! A unit keeps attempting until it succeeds, runs out of attempts, or its
//! overall deadline passes. The deadline is measured from the unit's start
//! so backoff sleeps count against it.

use std::time::{Duration, Instant};

use crate::config::schema::GreetingConfig;
use crate::resilience::backoff::backoff_delay;

/// Per-unit retry policy derived from the greeting configuration.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    overall_deadline: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &GreetingConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay_ms: config.base_delay_ms,
            max_delay_ms: config.max_delay_ms,
            overall_deadline: Duration::from_millis(config.overall_deadline_ms),
        }
    }

    /// Delay to wait before the attempt after `attempt` (1-based), or
    /// `None` when the policy is exhausted — either no attempts remain or
    /// the sleep would cross the overall deadline.
    pub fn next_delay(&self, attempt: u32, started: Instant) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }

        let delay = backoff_delay(attempt, self.base_delay_ms, self.max_delay_ms);
        if started.elapsed() + delay >= self.overall_deadline {
            return None;
        }

        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_attempts: u32, deadline_ms: u64) -> RetryPolicy {
        RetryPolicy::from_config(&GreetingConfig {
            max_attempts,
            base_delay_ms: 10,
            max_delay_ms: 100,
            overall_deadline_ms: deadline_ms,
            ..GreetingConfig::default()
        })
    }

    #[test]
    fn stops_after_max_attempts() {
        let policy = policy(3, 60_000);
        let started = Instant::now();
        assert!(policy.next_delay(1, started).is_some());
        assert!(policy.next_delay(2, started).is_some());
        assert!(policy.next_delay(3, started).is_none());
    }

    #[test]
    fn stops_when_deadline_passed() {
        let policy = policy(10, 50);
        let long_ago = Instant::now() - Duration::from_millis(200);
        assert!(policy.next_delay(1, long_ago).is_none());
    }

    #[test]
    fn first_retry_waits_at_least_base() {
        let policy = policy(5, 60_000);
        let delay = policy.next_delay(1, Instant::now()).unwrap();
        assert!(delay.as_millis() >= 10);
    }
}
