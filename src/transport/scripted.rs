//! Scripted in-memory transport for tests.
//!
//! Every submitted mutation is recorded and assigned the next [`TaskScript`]
//! from a queue. Fetching a task replays its script one status per call and
//! then repeats the last status forever, so terminal snapshots stay stable
//! across repeated reads.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::{Mutation, TaskTransport};
use crate::error::{Result, TransportError};
use crate::types::{
    EnqueuedTask, IndexSummary, TaskErrorPayload, TaskInfo, TaskStatus, TaskType,
};

const ENQUEUED_AT: &str = "2024-01-01T00:00:00Z";

/// Sequence of statuses a task reports, one per fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskScript {
    statuses: Vec<TaskStatus>,
    error: Option<TaskErrorPayload>,
}

impl TaskScript {
    /// Report `statuses` in order, repeating the last one.
    ///
    /// An empty list behaves like `[Succeeded]`.
    pub fn new(statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        let mut statuses: Vec<TaskStatus> = statuses.into_iter().collect();
        if statuses.is_empty() {
            statuses.push(TaskStatus::Succeeded);
        }
        Self {
            statuses,
            error: None,
        }
    }

    /// Terminal `Succeeded` on the `polls`-th fetch (at least the first).
    pub fn succeeds_after(polls: usize) -> Self {
        Self::terminal_after(polls, TaskStatus::Succeeded)
    }

    /// Terminal `Failed` with `error` on the `polls`-th fetch.
    pub fn fails_after(polls: usize, error: TaskErrorPayload) -> Self {
        Self::terminal_after(polls, TaskStatus::Failed).with_error(error)
    }

    /// Terminal `Canceled` on the `polls`-th fetch.
    pub fn canceled_after(polls: usize) -> Self {
        Self::terminal_after(polls, TaskStatus::Canceled)
    }

    /// `Processing` on every fetch.
    pub fn never_finishes() -> Self {
        Self::new([TaskStatus::Enqueued, TaskStatus::Processing])
    }

    /// Attach the error payload reported while the status is `Failed`.
    #[must_use]
    pub fn with_error(mut self, error: TaskErrorPayload) -> Self {
        self.error = Some(error);
        self
    }

    fn terminal_after(polls: usize, terminal: TaskStatus) -> Self {
        let waiting = polls.saturating_sub(1);
        let mut statuses = vec![TaskStatus::Processing; waiting];
        if let Some(first) = statuses.first_mut() {
            *first = TaskStatus::Enqueued;
        }
        statuses.push(terminal);
        Self::new(statuses)
    }

    fn status_at(&self, fetch: usize) -> TaskStatus {
        let last = self.statuses.len() - 1;
        self.statuses[fetch.min(last)]
    }
}

#[derive(Debug)]
struct ScriptedTask {
    mutation: Option<Mutation>,
    index_uid: String,
    task_type: TaskType,
    script: TaskScript,
    fetches: usize,
}

#[derive(Debug, Default)]
struct ScriptState {
    next_uid: u64,
    pending_scripts: VecDeque<TaskScript>,
    submit_failures: VecDeque<TransportError>,
    submissions: Vec<Mutation>,
    tasks: HashMap<u64, ScriptedTask>,
    fetch_log: Vec<u64>,
    indexes: Vec<IndexSummary>,
    features: Map<String, Value>,
    feature_failures: VecDeque<TransportError>,
    events: Vec<String>,
}

/// In-memory [`TaskTransport`] driven by [`TaskScript`]s.
///
/// Mutations without a queued script succeed on their first fetch. Index
/// creation and deletion are reflected in [`list_indexes`] once their task
/// has been observed as `Succeeded`.
///
/// [`list_indexes`]: TaskTransport::list_indexes
///
/// # Examples
///
/// ```
/// use index_tasks::transport::{Mutation, ScriptedTransport, TaskScript, TaskTransport};
/// use index_tasks::TaskStatus;
///
/// let runtime = tokio::runtime::Runtime::new().unwrap();
/// runtime.block_on(async {
///     let transport = ScriptedTransport::new();
///     transport.push_script(TaskScript::succeeds_after(2));
///
///     let mutation = Mutation::DeleteIndex { uid: "movies".to_string() };
///     let task = transport.submit(&mutation).await.unwrap();
///     let first = transport.fetch_task(task.task_uid).await.unwrap();
///     let second = transport.fetch_task(task.task_uid).await.unwrap();
///     assert_eq!(first.status, TaskStatus::Enqueued);
///     assert_eq!(second.status, TaskStatus::Succeeded);
///     assert_eq!(transport.fetch_count(task.task_uid), 2);
/// });
/// ```
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    state: Mutex<ScriptState>,
}

impl ScriptedTransport {
    /// Empty transport; task uids start at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the script for the next submitted mutation.
    pub fn push_script(&self, script: TaskScript) {
        self.state.lock().pending_scripts.push_back(script);
    }

    /// Make the next submit fail with `error` without creating a task.
    pub fn fail_next_submit(&self, error: TransportError) {
        self.state.lock().submit_failures.push_back(error);
    }

    /// Make the next experimental-features update fail with `error`.
    pub fn fail_next_feature_update(&self, error: TransportError) {
        self.state.lock().feature_failures.push_back(error);
    }

    /// Register a task directly, as if submitted by another client.
    pub fn insert_task(&self, task_uid: u64, index_uid: &str, script: TaskScript) {
        let mut state = self.state.lock();
        state.next_uid = state.next_uid.max(task_uid + 1);
        state.tasks.insert(
            task_uid,
            ScriptedTask {
                mutation: None,
                index_uid: index_uid.to_string(),
                task_type: TaskType::DocumentAdditionOrUpdate,
                script,
                fetches: 0,
            },
        );
    }

    /// Seed the index listing.
    pub fn set_indexes(&self, indexes: Vec<IndexSummary>) {
        self.state.lock().indexes = indexes;
    }

    /// Every mutation submitted so far, in order.
    pub fn submissions(&self) -> Vec<Mutation> {
        self.state.lock().submissions.clone()
    }

    /// Number of fetches of `task_uid` so far.
    pub fn fetch_count(&self, task_uid: u64) -> usize {
        self.state
            .lock()
            .tasks
            .get(&task_uid)
            .map_or(0, |task| task.fetches)
    }

    /// Experimental features enabled so far.
    pub fn experimental_features(&self) -> Map<String, Value> {
        self.state.lock().features.clone()
    }

    /// Writes in the order they happened: `features` for a feature update,
    /// the mutation description for a submit.
    pub fn write_log(&self) -> Vec<String> {
        self.state.lock().events.clone()
    }

    /// Task uids in the order they were fetched.
    pub fn fetch_log(&self) -> Vec<u64> {
        self.state.lock().fetch_log.clone()
    }

    fn snapshot(task_uid: u64, task: &ScriptedTask, status: TaskStatus) -> TaskInfo {
        let finished = status.is_terminal();
        TaskInfo {
            uid: task_uid,
            index_uid: Some(task.index_uid.clone()),
            status,
            task_type: task.task_type,
            error: if status == TaskStatus::Failed {
                task.script.error.clone()
            } else {
                None
            },
            details: None,
            duration: finished.then(|| "PT0.001S".to_string()),
            enqueued_at: Some(ENQUEUED_AT.to_string()),
            started_at: (status != TaskStatus::Enqueued).then(|| ENQUEUED_AT.to_string()),
            finished_at: finished.then(|| ENQUEUED_AT.to_string()),
        }
    }

    fn apply_success(state: &mut ScriptState, mutation: Option<Mutation>) {
        match mutation {
            Some(Mutation::CreateIndex { uid, primary_key }) => {
                if !state.indexes.iter().any(|index| index.uid == uid) {
                    state.indexes.push(IndexSummary::new(uid, primary_key));
                }
            },
            Some(Mutation::DeleteIndex { uid }) => state.indexes.retain(|index| index.uid != uid),
            Some(Mutation::AddDocuments { .. } | Mutation::UpdateSettings { .. }) | None => {},
        }
    }
}

#[async_trait]
impl TaskTransport for ScriptedTransport {
    async fn submit(&self, mutation: &Mutation) -> Result<EnqueuedTask> {
        let mut state = self.state.lock();
        if let Some(error) = state.submit_failures.pop_front() {
            return Err(error.into());
        }

        let task_uid = state.next_uid;
        state.next_uid += 1;
        let script = state
            .pending_scripts
            .pop_front()
            .unwrap_or_else(|| TaskScript::succeeds_after(1));

        state.submissions.push(mutation.clone());
        state.events.push(mutation.describe());
        state.tasks.insert(
            task_uid,
            ScriptedTask {
                mutation: Some(mutation.clone()),
                index_uid: mutation.index_uid().to_string(),
                task_type: mutation.task_type(),
                script,
                fetches: 0,
            },
        );

        Ok(EnqueuedTask {
            task_uid,
            index_uid: Some(mutation.index_uid().to_string()),
            status: TaskStatus::Enqueued,
            task_type: mutation.task_type(),
            enqueued_at: Some(ENQUEUED_AT.to_string()),
        })
    }

    async fn fetch_task(&self, task_uid: u64) -> Result<TaskInfo> {
        let mut state = self.state.lock();
        state.fetch_log.push(task_uid);

        let Some(task) = state.tasks.get_mut(&task_uid) else {
            return Err(TransportError::Status {
                method: "GET".to_string(),
                path: format!("/tasks/{task_uid}"),
                status: 404,
                body: format!(
                    "{{\"message\":\"Task `{task_uid}` not found.\",\"code\":\"task_not_found\"}}"
                ),
            }
            .into());
        };

        let status = task.script.status_at(task.fetches);
        task.fetches += 1;
        let snapshot = Self::snapshot(task_uid, task, status);
        let applied = (status == TaskStatus::Succeeded)
            .then(|| task.mutation.clone())
            .flatten();

        Self::apply_success(&mut state, applied);
        Ok(snapshot)
    }

    async fn list_indexes(&self, limit: usize) -> Result<Vec<IndexSummary>> {
        let state = self.state.lock();
        Ok(state.indexes.iter().take(limit).cloned().collect())
    }

    async fn update_experimental_features(
        &self,
        features: &Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let mut state = self.state.lock();
        if let Some(error) = state.feature_failures.pop_front() {
            return Err(error.into());
        }
        state
            .features
            .extend(features.iter().map(|(name, value)| (name.clone(), value.clone())));
        state.events.push("features".to_string());
        Ok(state.features.clone())
    }
}
