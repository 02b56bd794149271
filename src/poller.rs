//! Fixed-interval polling of a task until it is terminal.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::clock::{Clock, TokioClock};
use crate::error::{Error, Result};
use crate::transport::TaskTransport;
use crate::types::TaskInfo;

/// Default delay between two fetches of the same task.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default maximum wait for one task.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Poll cadence and overall timeout for waiting on a single task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Delay between two fetches.
    pub interval: Duration,
    /// Maximum time spent waiting before giving up.
    pub timeout: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TASK_TIMEOUT,
        }
    }
}

impl WaitOptions {
    /// Options with the given interval and timeout.
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Replace the poll interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Replace the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reject a zero interval or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(Error::InvalidArgument(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidArgument(
                "task timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Waits for tasks to reach a terminal state.
///
/// Every iteration fetches a fresh snapshot; nothing is cached between polls.
/// A task that never finishes is fetched `floor(timeout / interval) + 1`
/// times before [`Error::TimeoutExceeded`] is returned.
#[derive(Clone)]
pub struct TaskPoller {
    transport: Arc<dyn TaskTransport>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TaskPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPoller").finish_non_exhaustive()
    }
}

impl TaskPoller {
    /// Poller using wall-clock time.
    pub fn new(transport: Arc<dyn TaskTransport>) -> Self {
        Self::with_clock(transport, Arc::new(TokioClock))
    }

    /// Poller using `clock` for elapsed time and sleeps.
    pub fn with_clock(transport: Arc<dyn TaskTransport>, clock: Arc<dyn Clock>) -> Self {
        Self { transport, clock }
    }

    /// Fetch `task_uid` until it is terminal.
    ///
    /// A `Failed` or `Canceled` snapshot is a successful return; use
    /// [`TaskInfo::into_result`] to turn it into an error.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for a zero interval or timeout, before any fetch
    /// - [`Error::TimeoutExceeded`] with the last snapshot once another sleep
    ///   would exceed `options.timeout`
    /// - [`Error::Cancelled`] when `cancel` fires before a fetch or during a sleep
    /// - fetch errors, unchanged
    pub async fn wait_for_task(
        &self,
        task_uid: u64,
        options: WaitOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<TaskInfo> {
        options.validate()?;

        let start = self.clock.now();
        let mut polls: u32 = 0;

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                debug!(task_uid, polls, "wait cancelled before fetch");
                return Err(Error::Cancelled { task_uid });
            }

            let task = self.transport.fetch_task(task_uid).await?;
            polls += 1;
            debug!(task_uid, polls, status = %task.status, "polled task");

            if task.is_terminal() {
                return Ok(task);
            }

            let waited = self.clock.now().saturating_duration_since(start);
            if waited.saturating_add(options.interval) > options.timeout {
                warn!(
                    task_uid,
                    polls,
                    waited_ms = waited.as_millis() as u64,
                    status = %task.status,
                    "task did not finish in time"
                );
                return Err(Error::TimeoutExceeded {
                    task: Box::new(task),
                    waited,
                });
            }

            match cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        () = token.cancelled() => {
                            debug!(task_uid, polls, "wait cancelled during sleep");
                            return Err(Error::Cancelled { task_uid });
                        },
                        () = self.clock.sleep(options.interval) => {},
                    }
                },
                None => self.clock.sleep(options.interval).await,
            }
        }
    }
}
