//! Time source used by the poller.
//!
//! Polling needs two things from time: reading "now" and waiting out an
//! interval. Both go through [`Clock`] so tests can swap in [`ManualClock`],
//! which advances virtual time on every sleep and returns immediately.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

/// Source of the current instant and of sleeps.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Suspend the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock time backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock for tests.
///
/// `sleep` advances the clock by the requested duration and yields once,
/// so a poll loop runs to completion without real delays while still
/// observing elapsed time.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use index_tasks::clock::{Clock, ManualClock};
///
/// let runtime = tokio::runtime::Runtime::new().unwrap();
/// runtime.block_on(async {
///     let clock = ManualClock::new();
///     let start = clock.now();
///     clock.sleep(Duration::from_millis(10)).await;
///     assert_eq!(clock.now() - start, Duration::from_millis(10));
///     assert_eq!(clock.sleeps(), vec![Duration::from_millis(10)]);
/// });
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    state: Arc<Mutex<ManualState>>,
}

#[derive(Debug, Default)]
struct ManualState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    /// A clock frozen at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Arc::new(Mutex::new(ManualState::default())),
        }
    }

    /// Move virtual time forward without recording a sleep.
    pub fn advance(&self, duration: Duration) {
        self.state.lock().elapsed += duration;
    }

    /// Virtual time elapsed since creation.
    pub fn elapsed(&self) -> Duration {
        self.state.lock().elapsed
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.state.lock().elapsed
    }

    async fn sleep(&self, duration: Duration) {
        {
            let mut state = self.state.lock();
            state.elapsed += duration;
            state.sleeps.push(duration);
        }
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_clock_advances_on_sleep_and_advance() {
        let clock = ManualClock::new();
        let start = clock.now();

        clock.sleep(Duration::from_millis(10)).await;
        clock.advance(Duration::from_millis(5));
        clock.sleep(Duration::from_millis(10)).await;

        assert_eq!(clock.now() - start, Duration::from_millis(25));
        assert_eq!(clock.elapsed(), Duration::from_millis(25));
        assert_eq!(clock.sleeps().len(), 2);
    }

    #[tokio::test]
    async fn clones_share_virtual_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        other.sleep(Duration::from_secs(1)).await;
        assert_eq!(clock.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_follows_tokio_time() {
        let clock = TokioClock;
        let start = clock.now();
        clock.sleep(Duration::from_millis(50)).await;
        assert!(clock.now() - start >= Duration::from_millis(50));
    }
}
