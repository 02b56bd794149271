//! Error types for task synchronization.
//!
//! [`Error`] is returned by every fallible operation in the crate. Transport
//! failures are wrapped unchanged in [`TransportError`]; remote task failures
//! carry the service's payload verbatim. Nothing here is ever retried.

use std::time::Duration;

use thiserror::Error;

use crate::types::task::{TaskErrorPayload, TaskInfo};

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the request/response layer underneath the task core.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("{method} {path} returned status {status}: {body}")]
    Status {
        /// HTTP method of the request.
        method: String,
        /// Request path.
        path: String,
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The response body was not the expected JSON.
    #[error("Failed to decode response from {path}: {source}")]
    Decode {
        /// Request path.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The configured base URL cannot address the endpoint.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The service could not be reached.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur while submitting, polling or orchestrating tasks.
#[derive(Error, Debug)]
pub enum Error {
    /// Submit or fetch call failed below the task layer.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The task did not reach a terminal state within the allotted wait.
    #[error(
        "task {task_uid} did not reach a terminal state within {waited:?} (last status: {status})",
        task_uid = .task.uid,
        status = .task.status
    )]
    TimeoutExceeded {
        /// Last snapshot observed, always non-terminal.
        task: Box<TaskInfo>,
        /// Time spent waiting when the poller gave up.
        waited: Duration,
    },

    /// The service reported the task as `Failed`.
    #[error("task {task_uid} failed: {}", describe_payload(.error.as_ref()))]
    RemoteTaskFailed {
        /// The failed task.
        task_uid: u64,
        /// Error payload exactly as the service reported it.
        error: Option<TaskErrorPayload>,
    },

    /// The service reported the task as `Canceled`.
    #[error("task {task_uid} was canceled by the service")]
    TaskCanceled {
        /// The canceled task.
        task_uid: u64,
    },

    /// The caller's cancellation token fired while waiting.
    #[error("waiting for task {task_uid} was cancelled by the caller")]
    Cancelled {
        /// The task being waited on.
        task_uid: u64,
    },

    /// An argument was rejected before any request was made.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A payload could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be loaded or is inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// The task this error is about, when there is one.
    pub fn task_uid(&self) -> Option<u64> {
        match self {
            Self::TimeoutExceeded { task, .. } => Some(task.uid),
            Self::RemoteTaskFailed { task_uid, .. }
            | Self::TaskCanceled { task_uid }
            | Self::Cancelled { task_uid } => Some(*task_uid),
            Self::Transport(_)
            | Self::InvalidArgument(_)
            | Self::Serialization(_)
            | Self::Configuration(_) => None,
        }
    }

    /// The remote error payload, if the service reported one.
    pub fn remote_error(&self) -> Option<&TaskErrorPayload> {
        match self {
            Self::RemoteTaskFailed { error, .. } => error.as_ref(),
            _ => None,
        }
    }
}

fn describe_payload(error: Option<&TaskErrorPayload>) -> String {
    error.map_or_else(|| "no error detail reported".to_string(), TaskErrorPayload::to_json)
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(format!("TOML parse error: {}", err))
    }
}
