use std::time::Duration;

use rand::Rng;

/// Scheduling contract for the poll loop. All delays the automaton takes
/// are drawn from here so the cadence stays testable.
#[derive(Clone, Debug)]
pub struct PollPolicy {
    /// Lower bound of the jittered wait between poll attempts.
    pub poll_delay_min: Duration,
    /// Upper bound of the jittered wait between poll attempts.
    pub poll_delay_max: Duration,
    /// Fixed wait after a search submit, on top of page settling.
    pub settle_delay: Duration,
    /// How long to hold position after a SlotFound when auto-booking is
    /// disabled, giving a human time to act.
    pub hold: Duration,
    /// Default timeout for page operations.
    pub page_timeout: Duration,
    /// Pause before retrying a failed session launch.
    pub launch_retry_delay: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            poll_delay_min: Duration::from_secs(1),
            poll_delay_max: Duration::from_secs(5),
            settle_delay: Duration::from_secs(5),
            hold: Duration::from_secs(240),
            page_timeout: Duration::from_secs(60),
            launch_retry_delay: Duration::from_millis(500),
        }
    }
}

impl PollPolicy {
    /// Uniformly random delay in `[poll_delay_min, poll_delay_max]`.
    pub fn jitter(&self) -> Duration {
        let min = self.poll_delay_min.as_millis() as u64;
        let max = self.poll_delay_max.as_millis() as u64;
        if max <= min {
            return self.poll_delay_min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = PollPolicy {
            poll_delay_min: Duration::from_millis(100),
            poll_delay_max: Duration::from_millis(300),
            ..PollPolicy::default()
        };
        for _ in 0..100 {
            let delay = policy.jitter();
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(300));
        }
    }

    #[test]
    fn degenerate_range_returns_the_minimum() {
        let policy = PollPolicy {
            poll_delay_min: Duration::from_millis(200),
            poll_delay_max: Duration::from_millis(200),
            ..PollPolicy::default()
        };
        assert_eq!(policy.jitter(), Duration::from_millis(200));
    }
}
