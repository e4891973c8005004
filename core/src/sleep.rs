//! Sleep abstraction for the polling engine.
//!
//! The engine never calls a timer directly. It awaits a [`Sleeper`], racing
//! it against cancellation, so tests can substitute a sleeper that returns
//! immediately (see [`ManualClock`](crate::clock::ManualClock)).

use core::time::Duration;

use async_trait::async_trait;

/// Trait for sleep/delay implementations
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `duration` to elapse.
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by `tokio::time::sleep`.
///
/// Honours paused time in tests using `#[tokio::test(start_paused = true)]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Closure sleeper for custom sleep implementations
///
/// The closure is invoked synchronously and the sleep completes as soon as it
/// returns. Useful for recording requested waits in tests.
///
/// # Example
///
/// ```rust
/// use aap_retry::sleep::FnSleeper;
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// let waits = Arc::new(Mutex::new(Vec::new()));
/// let recorded = Arc::clone(&waits);
/// let sleeper = FnSleeper(move |duration: Duration| recorded.lock().unwrap().push(duration));
/// # let _ = sleeper;
/// ```
#[derive(Clone, Copy)]
pub struct FnSleeper<F>(pub F);

#[async_trait]
impl<F> Sleeper for FnSleeper<F>
where
    F: Fn(Duration) + Send + Sync,
{
    async fn sleep(&self, duration: Duration) {
        (self.0)(duration);
    }
}
