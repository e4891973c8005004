//! Spacing between polling attempts.
//!
//! Attempts are spaced by a fixed poll interval. Long-running policies add a
//! random offset on top so that many clients recovering from the same outage
//! do not hit the API in lockstep.

use core::time::Duration;

use rand::Rng;

/// Budgets above this get jittered waits.
pub const JITTER_THRESHOLD: Duration = Duration::from_secs(30);

/// Exclusive upper bound of the additive jitter.
pub const MAX_JITTER: Duration = Duration::from_secs(2);

/// Floor applied to the poll interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Wait calculation for one polling run.
///
/// # Example
///
/// ```rust
/// use aap_retry::backoff::PollBackoff;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
/// use std::time::Duration;
///
/// let backoff = PollBackoff::new(Duration::from_secs(5), Duration::from_secs(10));
/// let mut rng = StdRng::seed_from_u64(7);
/// assert_eq!(backoff.delay(&mut rng), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollBackoff {
    /// Minimum spacing between attempts
    pub poll_interval: Duration,
    /// Overall budget of the run
    pub timeout: Duration,
}

impl PollBackoff {
    pub fn new(poll_interval: Duration, timeout: Duration) -> Self {
        Self {
            poll_interval,
            timeout,
        }
    }

    /// Whether waits get a random offset.
    pub fn jitter_enabled(&self) -> bool {
        self.timeout > JITTER_THRESHOLD
    }

    /// Wait before the next attempt: the (floored) poll interval, plus a
    /// uniform draw from `[0, MAX_JITTER)` when [`jitter_enabled`](Self::jitter_enabled).
    pub fn delay<R: Rng>(&self, rng: &mut R) -> Duration {
        self.next_delay(Some(rng))
    }

    /// Like [`delay`](Self::delay), without jitter when no generator is available.
    pub fn next_delay<R: Rng>(&self, rng: Option<&mut R>) -> Duration {
        let base = self.poll_interval.max(MIN_POLL_INTERVAL);
        match rng {
            Some(rng) if self.jitter_enabled() => base.saturating_add(jitter(rng)),
            _ => base,
        }
    }
}

/// Draw a jitter offset uniformly from `[0, MAX_JITTER)`.
pub fn jitter<R: Rng>(rng: &mut R) -> Duration {
    let bound = MAX_JITTER.as_nanos() as u64;
    Duration::from_nanos(rng.random_range(0..bound))
}
