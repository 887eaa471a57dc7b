//! Timer capability used by time-based windows.
//!
//! Windows never read a global clock; they ask the `Scheduler` injected into the
//! execution. `TokioScheduler` follows tokio's clock, so tests running with paused
//! time get deterministic window boundaries.

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::time::Instant;

pub trait Scheduler: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Completes at `deadline`. Dropping the future cancels the timer.
    fn sleep_until(&self, deadline: Instant) -> BoxFuture<'static, ()>;
}

/// Scheduler backed by `tokio::time`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) -> BoxFuture<'static, ()> {
        tokio::time::sleep_until(deadline).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_follows_paused_clock() {
        let scheduler = TokioScheduler;
        let start = scheduler.now();
        scheduler.sleep_until(start + Duration::from_secs(5)).await;
        assert_eq!(scheduler.now() - start, Duration::from_secs(5));
    }
}
