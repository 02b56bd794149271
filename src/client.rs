//! Mutating operations wrapped with optional completion waiting.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::poller::{TaskPoller, WaitOptions};
use crate::transport::{HttpTransport, Mutation, TaskTransport};
use crate::types::{EnqueuedTask, Settings, TaskInfo, TaskStatus};

/// Page size used when listing indexes for teardown.
pub const INDEX_PAGE_LIMIT: usize = 20;

/// Whether a mutation call returns right after submission or waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Return the pending handle without polling.
    Async,
    /// Poll until the task is terminal.
    Wait(WaitOptions),
}

/// Outcome of [`TaskClient::submit_and_wait`].
#[derive(Debug, Clone, PartialEq)]
pub enum TaskHandle {
    /// Submitted but never polled.
    Enqueued(EnqueuedTask),
    /// Terminal snapshot.
    Finished(TaskInfo),
}

impl TaskHandle {
    /// Uid of the underlying task.
    pub fn task_uid(&self) -> u64 {
        match self {
            Self::Enqueued(task) => task.task_uid,
            Self::Finished(task) => task.uid,
        }
    }

    /// Last status known for the task.
    pub fn status(&self) -> TaskStatus {
        match self {
            Self::Enqueued(task) => task.status,
            Self::Finished(task) => task.status,
        }
    }

    /// The terminal snapshot, if the task was waited on.
    pub fn finished(self) -> Option<TaskInfo> {
        match self {
            Self::Enqueued(_) => None,
            Self::Finished(task) => Some(task),
        }
    }
}

/// Submits mutations and waits for their tasks.
///
/// Cheap to clone; clones share the transport and clock.
///
/// # Examples
///
/// ```rust,no_run
/// use index_tasks::{ClientConfig, TaskClient};
///
/// # async fn example() -> index_tasks::Result<()> {
/// let client = TaskClient::from_config(&ClientConfig::from_env()?)?;
/// let task = client.create_index("movies", Some("id")).await?;
/// assert!(task.is_success());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TaskClient {
    transport: Arc<dyn TaskTransport>,
    poller: TaskPoller,
    wait_options: WaitOptions,
}

impl std::fmt::Debug for TaskClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskClient")
            .field("wait_options", &self.wait_options)
            .finish_non_exhaustive()
    }
}

impl TaskClient {
    /// Client over `transport` with wall-clock polling and default wait options.
    pub fn new(transport: Arc<dyn TaskTransport>) -> Self {
        Self {
            poller: TaskPoller::new(transport.clone()),
            transport,
            wait_options: WaitOptions::default(),
        }
    }

    /// HTTP client built from `config`, using its poll interval and timeout.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Arc::new(transport)).with_wait_options(config.wait_options()))
    }

    /// Replace the clock used while polling.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.poller = TaskPoller::with_clock(self.transport.clone(), clock);
        self
    }

    /// Replace the wait options used by the convenience methods.
    #[must_use]
    pub fn with_wait_options(mut self, options: WaitOptions) -> Self {
        self.wait_options = options;
        self
    }

    /// Wait options used by the convenience methods.
    pub fn wait_options(&self) -> WaitOptions {
        self.wait_options
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Arc<dyn TaskTransport> {
        &self.transport
    }

    /// Submit `mutation` once, without waiting.
    ///
    /// Submit errors are returned as-is and never retried.
    pub async fn submit(&self, mutation: &Mutation) -> Result<EnqueuedTask> {
        let task = self.transport.submit(mutation).await?;
        info!(
            task_uid = task.task_uid,
            operation = %mutation.describe(),
            "submitted task"
        );
        Ok(task)
    }

    /// Submit `mutation` and, depending on `completion`, wait for it.
    pub async fn submit_and_wait(
        &self,
        mutation: &Mutation,
        completion: Completion,
        cancel: Option<&CancellationToken>,
    ) -> Result<TaskHandle> {
        if let Completion::Wait(options) = completion {
            options.validate()?;
        }
        let enqueued = self.submit(mutation).await?;
        match completion {
            Completion::Async => Ok(TaskHandle::Enqueued(enqueued)),
            Completion::Wait(options) => {
                let task = self
                    .poller
                    .wait_for_task(enqueued.task_uid, options, cancel)
                    .await?;
                Ok(TaskHandle::Finished(task))
            },
        }
    }

    /// Submit `mutation` and wait for its terminal snapshot.
    ///
    /// A `Failed` or `Canceled` task is returned as `Ok`. Invalid `options`
    /// are rejected before anything is submitted.
    pub async fn execute(
        &self,
        mutation: &Mutation,
        options: WaitOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<TaskInfo> {
        options.validate()?;
        let enqueued = self.submit(mutation).await?;
        self.poller
            .wait_for_task(enqueued.task_uid, options, cancel)
            .await
    }

    /// Wait for an already submitted task with the client's wait options.
    pub async fn wait_for_task(
        &self,
        task_uid: u64,
        cancel: Option<&CancellationToken>,
    ) -> Result<TaskInfo> {
        self.poller
            .wait_for_task(task_uid, self.wait_options, cancel)
            .await
    }

    /// Toggle experimental features on the service.
    ///
    /// Synchronous on the service side: no task is created or polled.
    pub async fn update_experimental_features(
        &self,
        features: &Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let applied = self.transport.update_experimental_features(features).await?;
        info!(features = %serde_json::Value::Object(features.clone()), "updated experimental features");
        Ok(applied)
    }

    /// Create an index and wait for it; a non-success outcome is an error.
    pub async fn create_index(&self, uid: &str, primary_key: Option<&str>) -> Result<TaskInfo> {
        let mutation = Mutation::CreateIndex {
            uid: uid.to_string(),
            primary_key: primary_key.map(str::to_string),
        };
        self.run_to_success(&mutation).await
    }

    /// Add or replace documents and wait; a non-success outcome is an error.
    pub async fn add_documents<D: Serialize>(
        &self,
        index_uid: &str,
        documents: &[D],
        primary_key: Option<&str>,
    ) -> Result<TaskInfo> {
        let mutation = Mutation::AddDocuments {
            index_uid: index_uid.to_string(),
            documents: to_documents(documents)?,
            primary_key: primary_key.map(str::to_string),
        };
        self.run_to_success(&mutation).await
    }

    /// Update index settings and wait; a non-success outcome is an error.
    pub async fn update_settings(&self, index_uid: &str, settings: &Settings) -> Result<TaskInfo> {
        let mutation = Mutation::UpdateSettings {
            index_uid: index_uid.to_string(),
            settings: settings.clone(),
        };
        self.run_to_success(&mutation).await
    }

    /// Delete an index and wait; a non-success outcome is an error.
    pub async fn delete_index(&self, uid: &str) -> Result<TaskInfo> {
        let mutation = Mutation::DeleteIndex {
            uid: uid.to_string(),
        };
        self.run_to_success(&mutation).await
    }

    /// Delete every index on the first listing page, one at a time.
    ///
    /// Stops at the first deletion that does not succeed.
    pub async fn delete_all_indexes(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<TaskInfo>> {
        let indexes = self.transport.list_indexes(INDEX_PAGE_LIMIT).await?;
        debug!(count = indexes.len(), "deleting indexes");

        let mut deleted = Vec::with_capacity(indexes.len());
        for index in indexes {
            let mutation = Mutation::DeleteIndex { uid: index.uid };
            let task = self
                .execute(&mutation, self.wait_options, cancel)
                .await?
                .into_result()?;
            deleted.push(task);
        }
        Ok(deleted)
    }

    async fn run_to_success(&self, mutation: &Mutation) -> Result<TaskInfo> {
        self.execute(mutation, self.wait_options, None)
            .await?
            .into_result()
    }
}

/// Serialize documents into JSON objects.
///
/// Anything that does not serialize to an object is rejected.
pub fn to_documents<D: Serialize>(documents: &[D]) -> Result<Vec<Value>> {
    documents
        .iter()
        .enumerate()
        .map(|(position, document)| match serde_json::to_value(document)? {
            value @ Value::Object(_) => Ok(value),
            other => Err(Error::InvalidArgument(format!(
                "document {position} is not a JSON object: {other}"
            ))),
        })
        .collect()
}
