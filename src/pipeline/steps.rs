//! Generic all-or-nothing step combinator.
//!
//! A [`Step`] is a labelled operation producing a terminal [`TaskInfo`]. Steps
//! run strictly in order, each result is passed through
//! [`TaskInfo::into_result`], and the first error stops the run. Nothing here
//! knows about HTTP or the poller, so any async `() -> Result<TaskInfo>` works.

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::types::{TaskErrorPayload, TaskInfo};

/// Boxed future returned by a step's operation.
pub type StepFuture = BoxFuture<'static, crate::Result<TaskInfo>>;

/// A labelled operation run once by [`run_steps`].
pub struct Step {
    label: String,
    operation: Box<dyn FnOnce() -> StepFuture + Send>,
}

impl Step {
    /// Wrap `operation` under `label`.
    ///
    /// # Example
    /// ```
    /// use index_tasks::pipeline::Step;
    /// use index_tasks::{Error, TaskInfo};
    ///
    /// let step = Step::new("always fails", || async {
    ///     Err::<TaskInfo, _>(Error::InvalidArgument("nope".to_string()))
    /// });
    /// assert_eq!(step.label(), "always fails");
    /// ```
    pub fn new<F, Fut>(label: impl Into<String>, operation: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = crate::Result<TaskInfo>> + Send + 'static,
    {
        Self {
            label: label.into(),
            operation: Box::new(move || operation().boxed()),
        }
    }

    /// Human-readable label, used in logs and failures.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Progress of a pipeline run.
///
/// `NotStarted -> Running { step } -> Succeeded | Failed { step }`, with
/// `step` the zero-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No step has started.
    NotStarted,
    /// Step `step` is running.
    Running {
        /// Zero-based position of the running step.
        step: usize,
    },
    /// Every step succeeded.
    Succeeded,
    /// Step `step` failed and the run stopped.
    Failed {
        /// Zero-based position of the failed step.
        step: usize,
    },
}

impl PipelineState {
    /// Returns `true` once the run can no longer progress.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }
}

/// A step that completed successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// Label of the step.
    pub label: String,
    /// The step's `Succeeded` snapshot.
    pub task: TaskInfo,
}

/// Result of a pipeline whose steps all succeeded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupReport {
    /// Completed steps, in execution order.
    pub steps: Vec<StepOutcome>,
}

impl SetupReport {
    /// Uids of the tasks of every step, in order.
    pub fn task_uids(&self) -> Vec<u64> {
        self.steps.iter().map(|outcome| outcome.task.uid).collect()
    }
}

/// A pipeline stopped at step `step_index`.
#[derive(Debug, Error)]
#[error("setup step {} ('{step}') failed: {cause}", .step_index + 1)]
pub struct SetupFailure {
    /// Label of the failing step.
    pub step: String,
    /// Zero-based position of the failing step.
    pub step_index: usize,
    /// Steps that succeeded before the failure.
    pub completed: Vec<StepOutcome>,
    /// Why the step failed.
    #[source]
    pub cause: Error,
}

impl SetupFailure {
    /// Uid of the failing step's task, when one was created.
    pub fn task_uid(&self) -> Option<u64> {
        self.cause.task_uid()
    }

    /// Error payload reported by the service for the failing task.
    pub fn remote_error(&self) -> Option<&TaskErrorPayload> {
        self.cause.remote_error()
    }
}

/// Run `steps` in order, stopping at the first one that does not succeed.
pub async fn run_steps<I>(steps: I) -> Result<SetupReport, SetupFailure>
where
    I: IntoIterator<Item = Step>,
{
    run_steps_observed(steps, |_| {}).await
}

/// Like [`run_steps`], reporting every state transition to `observer`.
pub async fn run_steps_observed<I, O>(
    steps: I,
    mut observer: O,
) -> Result<SetupReport, SetupFailure>
where
    I: IntoIterator<Item = Step>,
    O: FnMut(PipelineState),
{
    let mut report = SetupReport::default();
    observer(PipelineState::NotStarted);

    for (step_index, step) in steps.into_iter().enumerate() {
        let Step { label, operation } = step;
        observer(PipelineState::Running { step: step_index });
        info!(step = %label, step_index, "running setup step");

        match operation().await.and_then(TaskInfo::into_result) {
            Ok(task) => {
                debug!(step = %label, task_uid = task.uid, "setup step succeeded");
                report.steps.push(StepOutcome { label, task });
            },
            Err(cause) => {
                warn!(step = %label, step_index, error = %cause, "setup step failed");
                observer(PipelineState::Failed { step: step_index });
                return Err(SetupFailure {
                    step: label,
                    step_index,
                    completed: report.steps,
                    cause,
                });
            },
        }
    }

    observer(PipelineState::Succeeded);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaskStatus, TaskType};
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn task(uid: u64, status: TaskStatus) -> TaskInfo {
        TaskInfo {
            uid,
            index_uid: Some("movies".to_string()),
            status,
            task_type: TaskType::IndexCreation,
            error: None,
            details: None,
            duration: None,
            enqueued_at: None,
            started_at: None,
            finished_at: None,
        }
    }

    fn recording_step(log: &Arc<Mutex<Vec<u64>>>, uid: u64, status: TaskStatus) -> Step {
        let log = log.clone();
        Step::new(format!("step {uid}"), move || async move {
            log.lock().push(uid);
            Ok(task(uid, status))
        })
    }

    #[tokio::test]
    async fn runs_all_steps_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = (0..4).map(|uid| recording_step(&log, uid, TaskStatus::Succeeded));

        let report = run_steps(steps.collect::<Vec<_>>()).await.unwrap();

        assert_eq!(report.task_uids(), vec![0, 1, 2, 3]);
        assert_eq!(*log.lock(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![
            recording_step(&log, 0, TaskStatus::Succeeded),
            recording_step(&log, 1, TaskStatus::Canceled),
            recording_step(&log, 2, TaskStatus::Succeeded),
        ];

        let failure = run_steps(steps).await.unwrap_err();

        assert_eq!(failure.step, "step 1");
        assert_eq!(failure.step_index, 1);
        assert_eq!(failure.task_uid(), Some(1));
        assert_eq!(failure.completed.len(), 1);
        assert!(matches!(failure.cause, Error::TaskCanceled { task_uid: 1 }));
        assert_eq!(*log.lock(), vec![0, 1]);
    }

    #[tokio::test]
    async fn operation_error_names_the_step() {
        let steps = vec![Step::new("configure", || async {
            Err(Error::InvalidArgument("bad settings".to_string()))
        })];

        let failure = run_steps(steps).await.unwrap_err();

        assert_eq!(
            failure.to_string(),
            "setup step 1 ('configure') failed: Invalid argument: bad settings"
        );
        assert_eq!(failure.task_uid(), None);
    }

    #[tokio::test]
    async fn observer_sees_state_machine() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let steps = vec![
            recording_step(&log, 0, TaskStatus::Succeeded),
            recording_step(&log, 1, TaskStatus::Failed),
        ];
        let mut states = Vec::new();

        let _ = run_steps_observed(steps, |state| states.push(state)).await;

        assert_eq!(
            states,
            vec![
                PipelineState::NotStarted,
                PipelineState::Running { step: 0 },
                PipelineState::Running { step: 1 },
                PipelineState::Failed { step: 1 },
            ]
        );
        assert!(states.last().is_some_and(PipelineState::is_finished));
    }

    #[tokio::test]
    async fn empty_pipeline_succeeds() {
        let mut states = Vec::new();
        let report = run_steps_observed(Vec::new(), |state| states.push(state))
            .await
            .unwrap();
        assert!(report.steps.is_empty());
        assert_eq!(
            states,
            vec![PipelineState::NotStarted, PipelineState::Succeeded]
        );
    }
}
