use std::time::{Duration, Instant};

/// Monotonic cutoff handed to encoder and store calls so no single request
/// can block indefinitely. Expiry is reported as a timeout outcome, never as
/// not-found.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Deadline(Instant::now() + budget)
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.0
    }

    /// Time left before the cutoff, `None` once expired.
    pub fn remaining(&self) -> Option<Duration> {
        self.0.checked_duration_since(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_deadline_not_expired() {
        let d = Deadline::after(Duration::from_secs(60));
        assert!(!d.expired());
        assert!(d.remaining().is_some());
    }

    #[test]
    fn test_zero_budget_expires_immediately() {
        let d = Deadline::after(Duration::ZERO);
        assert!(d.expired());
        assert!(d.remaining().is_none());
    }
}
