//! Inter-batch pacing.
//!
//! The pause between pages exists only to stay under backend and GitHub API
//! rate limits.  It is a policy value handed to the scheduler, so tests can
//! run with zero delay or with tokio's paused clock.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingPolicy {
    /// Always wait the same amount.
    Constant(Duration),
    /// Start at `initial`, multiply by `factor` per page, never exceed `max`.
    Exponential {
        initial: Duration,
        factor: u32,
        max: Duration,
    },
}

impl Default for PacingPolicy {
    fn default() -> Self {
        PacingPolicy::Constant(Duration::from_millis(1000))
    }
}

impl PacingPolicy {
    /// How long to wait after rendering `page` before fetching the next.
    pub fn delay_after(&self, page: u32) -> Duration {
        match *self {
            PacingPolicy::Constant(delay) => delay,
            PacingPolicy::Exponential {
                initial,
                factor,
                max,
            } => {
                let steps = page.saturating_sub(1);
                let multiplier = factor.max(1).saturating_pow(steps);
                initial.saturating_mul(multiplier).min(max)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_delay_ignores_page() {
        let p = PacingPolicy::Constant(Duration::from_millis(300));
        assert_eq!(p.delay_after(1), Duration::from_millis(300));
        assert_eq!(p.delay_after(40), Duration::from_millis(300));
    }

    #[test]
    fn exponential_delay_grows_then_caps() {
        let p = PacingPolicy::Exponential {
            initial: Duration::from_millis(250),
            factor: 2,
            max: Duration::from_secs(2),
        };
        assert_eq!(p.delay_after(1), Duration::from_millis(250));
        assert_eq!(p.delay_after(2), Duration::from_millis(500));
        assert_eq!(p.delay_after(4), Duration::from_secs(2));
        assert_eq!(p.delay_after(u32::MAX), Duration::from_secs(2));
    }
}
