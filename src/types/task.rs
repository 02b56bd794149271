//! Task wire types for the indexing service's asynchronous task API.
//!
//! Every mutating call on the service answers with an [`EnqueuedTask`]
//! and performs the work out-of-band. The full [`TaskInfo`] snapshot is
//! fetched by uid until its [`TaskStatus`] becomes terminal.
//!
//! # Serialization
//!
//! All types use `#[serde(rename_all = "camelCase")]` to match the service's
//! JSON field naming. Statuses serialize as lowercase strings
//! (`"enqueued"`, `"processing"`, `"succeeded"`, `"failed"`, `"canceled"`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{Error, Result};

/// Task lifecycle status as reported by the service.
///
/// ```text
/// Enqueued -> Processing -> Succeeded | Failed
/// Enqueued | Processing -> Canceled
/// ```
///
/// `Succeeded`, `Failed` and `Canceled` are terminal: once observed, the
/// service never reports another status for that task.
///
/// # Examples
///
/// ```
/// use index_tasks::TaskStatus;
///
/// assert!(!TaskStatus::Processing.is_terminal());
/// assert!(TaskStatus::Failed.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Accepted by the service, waiting in its queue.
    Enqueued,
    /// Currently being applied.
    Processing,
    /// Applied successfully (terminal).
    Succeeded,
    /// Rejected or errored while processing (terminal).
    Failed,
    /// Canceled on the service before completion (terminal).
    Canceled,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enqueued => write!(f, "enqueued"),
            Self::Processing => write!(f, "processing"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

impl TaskStatus {
    /// Returns `true` if this status is terminal.
    ///
    /// Terminal states are `Succeeded`, `Failed`, and `Canceled`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

/// Kind of work a task performs.
///
/// Unknown kinds reported by newer service versions deserialize as
/// [`TaskType::Unknown`] instead of failing the whole snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskType {
    /// `POST /indexes`
    IndexCreation,
    /// `PATCH /indexes/{uid}`
    IndexUpdate,
    /// `DELETE /indexes/{uid}`
    IndexDeletion,
    /// Swap of two indexes.
    IndexSwap,
    /// `POST /indexes/{uid}/documents`
    DocumentAdditionOrUpdate,
    /// Document deletion by id, batch or filter.
    DocumentDeletion,
    /// `PATCH /indexes/{uid}/settings`
    SettingsUpdate,
    /// Dump creation.
    DumpCreation,
    /// Snapshot creation.
    SnapshotCreation,
    /// Cancellation of other tasks.
    TaskCancelation,
    /// Deletion of other tasks.
    TaskDeletion,
    /// Anything this client does not know about.
    #[serde(other)]
    Unknown,
}

/// Error detail attached to a `Failed` task.
///
/// Kept verbatim: fields the client does not model are preserved in
/// `extra` so the payload can be surfaced exactly as the service sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskErrorPayload {
    /// Human-readable message.
    pub message: String,

    /// Machine-readable code, e.g. `invalid_settings_filterable_attributes`.
    pub code: String,

    /// Error category (`invalid_request`, `internal`, ...).
    #[serde(rename = "type")]
    pub error_type: String,

    /// Documentation link for the code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Fields not modeled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TaskErrorPayload {
    /// Create a payload with a code and message and no link.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            error_type: "invalid_request".to_string(),
            link: None,
            extra: Map::new(),
        }
    }

    /// Serialize the payload back to its JSON wire form.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self}"))
    }
}

impl fmt::Display for TaskErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Response to a mutating request: the service's receipt for the queued work.
///
/// This is the only task value the client ever holds before polling. It is
/// never inspected for terminality; use its `task_uid` with the poller.
///
/// # Examples
///
/// ```
/// use index_tasks::{EnqueuedTask, TaskStatus};
///
/// let json = r#"{
///     "taskUid": 12,
///     "indexUid": "movies",
///     "status": "enqueued",
///     "type": "indexCreation",
///     "enqueuedAt": "2024-01-01T00:00:00Z"
/// }"#;
/// let task: EnqueuedTask = serde_json::from_str(json).unwrap();
/// assert_eq!(task.task_uid, 12);
/// assert_eq!(task.status, TaskStatus::Enqueued);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueuedTask {
    /// Identifier to poll with.
    pub task_uid: u64,

    /// Index the task applies to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_uid: Option<String>,

    /// Status at submission time, usually `Enqueued`.
    pub status: TaskStatus,

    /// Kind of work queued.
    #[serde(rename = "type")]
    pub task_type: TaskType,

    /// ISO 8601 timestamp of acceptance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enqueued_at: Option<String>,
}

/// A full task snapshot as returned by `GET /tasks/{uid}`.
///
/// The client keeps only the latest snapshot for a task; each poll replaces
/// the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    /// Identifier issued at submission time.
    pub uid: u64,

    /// Index the task applies to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_uid: Option<String>,

    /// Current lifecycle status.
    pub status: TaskStatus,

    /// Kind of work.
    #[serde(rename = "type")]
    pub task_type: TaskType,

    /// Error detail, present only when `status` is `Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskErrorPayload>,

    /// Kind-specific details (received documents, settings, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,

    /// ISO 8601 duration of processing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    /// ISO 8601 timestamp of acceptance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enqueued_at: Option<String>,

    /// ISO 8601 timestamp of processing start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,

    /// ISO 8601 timestamp of processing end.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

impl TaskInfo {
    /// Returns `true` once the task can no longer change status.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns `true` if the task succeeded.
    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Succeeded
    }

    /// Converts a terminal snapshot into a `Result`.
    ///
    /// `Succeeded` yields the snapshot back. `Failed` becomes
    /// [`Error::RemoteTaskFailed`] carrying the service's payload verbatim and
    /// `Canceled` becomes [`Error::TaskCanceled`]. A non-terminal snapshot is
    /// reported as [`Error::InvalidArgument`] since it has no outcome yet.
    ///
    /// # Examples
    ///
    /// ```
    /// use index_tasks::{Error, TaskInfo, TaskStatus, TaskType};
    ///
    /// let task = TaskInfo {
    ///     uid: 3,
    ///     index_uid: Some("movies".to_string()),
    ///     status: TaskStatus::Canceled,
    ///     task_type: TaskType::SettingsUpdate,
    ///     error: None,
    ///     details: None,
    ///     duration: None,
    ///     enqueued_at: None,
    ///     started_at: None,
    ///     finished_at: None,
    /// };
    /// assert!(matches!(task.into_result(), Err(Error::TaskCanceled { task_uid: 3 })));
    /// ```
    pub fn into_result(self) -> Result<TaskInfo> {
        match self.status {
            TaskStatus::Succeeded => Ok(self),
            TaskStatus::Failed => Err(Error::RemoteTaskFailed {
                task_uid: self.uid,
                error: self.error,
            }),
            TaskStatus::Canceled => Err(Error::TaskCanceled { task_uid: self.uid }),
            TaskStatus::Enqueued | TaskStatus::Processing => Err(Error::InvalidArgument(format!(
                "task {} has not finished (status: {})",
                self.uid, self.status
            ))),
        }
    }
}
