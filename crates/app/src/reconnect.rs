use std::time::{Duration, Instant};

use adaptive_music_core::ReconnectConfig;

/// Host-side retry policy: a bounded number of attempts, each after a fixed
/// delay from the moment the link was lost.
#[derive(Debug, Clone)]
pub struct Reconnector {
    max_attempts: u32,
    attempts: u32,
    delay: Duration,
    lost_at: Option<Instant>,
}

impl Reconnector {
    pub fn new(config: &ReconnectConfig) -> Self {
        Self {
            max_attempts: config.attempts,
            attempts: 0,
            delay: config.delay(),
            lost_at: None,
        }
    }

    /// Records an unexpected drop or failed attempt.
    pub fn link_lost(&mut self, now: Instant) {
        if self.lost_at.is_none() {
            self.lost_at = Some(now);
        }
    }

    /// A connection opened: the budget starts over.
    pub fn link_restored(&mut self) {
        self.attempts = 0;
        self.lost_at = None;
    }

    /// Whether to dial again now. Consumes one attempt when it says yes.
    pub fn should_retry(&mut self, now: Instant) -> bool {
        let Some(lost_at) = self.lost_at else {
            return false;
        };
        if self.attempts >= self.max_attempts || now.duration_since(lost_at) < self.delay {
            return false;
        }

        self.attempts += 1;
        self.lost_at = None;
        true
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(attempts: u32, delay_ms: u64) -> Reconnector {
        Reconnector::new(&ReconnectConfig { attempts, delay_ms })
    }

    #[test]
    fn never_retries_by_default() {
        let mut reconnector = Reconnector::new(&ReconnectConfig::default());
        let now = Instant::now();
        reconnector.link_lost(now);
        assert!(!reconnector.should_retry(now + Duration::from_secs(60)));
    }

    #[test]
    fn waits_for_the_delay() {
        let mut reconnector = policy(3, 500);
        let now = Instant::now();
        reconnector.link_lost(now);

        assert!(!reconnector.should_retry(now + Duration::from_millis(100)));
        assert!(reconnector.should_retry(now + Duration::from_millis(500)));
        assert!(!reconnector.should_retry(now + Duration::from_millis(600)));
    }

    #[test]
    fn stops_after_budget_and_resets_on_success() {
        let mut reconnector = policy(2, 0);
        let now = Instant::now();
        for _ in 0..2 {
            reconnector.link_lost(now);
            assert!(reconnector.should_retry(now));
        }
        reconnector.link_lost(now);
        assert!(!reconnector.should_retry(now));

        reconnector.link_restored();
        reconnector.link_lost(now);
        assert!(reconnector.should_retry(now));
        assert_eq!(reconnector.attempts(), 1);
    }
}
