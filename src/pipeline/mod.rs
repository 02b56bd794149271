//! Multi-step setup pipelines.
//!
//! A [`SetupPipeline`] is an ordered list of mutations. Running it submits
//! each mutation, waits for its task and only then moves on, so a settings
//! update never races the document ingestion it depends on. The first step
//! that does not reach `Succeeded` aborts the run with a [`SetupFailure`]
//! naming that step.
//!
//! ```rust,no_run
//! use index_tasks::pipeline::SetupPipeline;
//! use index_tasks::transport::Mutation;
//! use index_tasks::{ClientConfig, Settings, TaskClient, WaitOptions};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = TaskClient::from_config(&ClientConfig::default())?;
//! let report = SetupPipeline::new()
//!     .step(Mutation::CreateIndex { uid: "movies".into(), primary_key: Some("id".into()) })
//!     .step(Mutation::AddDocuments {
//!         index_uid: "movies".into(),
//!         documents: vec![json!({ "id": 1, "genre": "drama" })],
//!         primary_key: None,
//!     })
//!     .step(Mutation::UpdateSettings {
//!         index_uid: "movies".into(),
//!         settings: Settings::new().with_filterable_attributes(["genre"]),
//!     })
//!     .run(&client, WaitOptions::default(), None)
//!     .await?;
//! assert_eq!(report.steps.len(), 3);
//! # Ok(())
//! # }
//! ```

mod recipes;
mod steps;

pub use self::recipes::{IndexSetup, VECTOR_STORE_FEATURE};
pub use self::steps::{
    run_steps, run_steps_observed, PipelineState, SetupFailure, SetupReport, Step, StepFuture,
    StepOutcome,
};

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::client::TaskClient;
use crate::poller::WaitOptions;
use crate::transport::Mutation;

/// One mutation of a [`SetupPipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct MutationStep {
    /// Label reported in logs and failures.
    pub label: String,
    /// Mutation to submit.
    pub mutation: Mutation,
}

/// Label of the failure reported when enabling experimental features fails.
pub const FEATURES_STEP: &str = "enable experimental features";

/// Ordered mutations run as one all-or-nothing setup.
///
/// Experimental features, if any, are enabled before the first step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupPipeline {
    experimental_features: Map<String, Value>,
    steps: Vec<MutationStep>,
}

impl SetupPipeline {
    /// Empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `mutation`, labelled by its description.
    #[must_use]
    pub fn step(self, mutation: Mutation) -> Self {
        let label = mutation.describe();
        self.labeled_step(label, mutation)
    }

    /// Append `mutation` under an explicit label.
    #[must_use]
    pub fn labeled_step(mut self, label: impl Into<String>, mutation: Mutation) -> Self {
        self.steps.push(MutationStep {
            label: label.into(),
            mutation,
        });
        self
    }

    /// Enable experimental feature `name` before running any step.
    #[must_use]
    pub fn enable_experimental_feature(mut self, name: impl Into<String>) -> Self {
        self.experimental_features.insert(name.into(), Value::Bool(true));
        self
    }

    /// Experimental features set before the first step.
    pub fn experimental_features(&self) -> &Map<String, Value> {
        &self.experimental_features
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[MutationStep] {
        &self.steps
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if the pipeline has no step.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step with `per_step` as each task's wait options.
    ///
    /// Consumes the pipeline; a failed run has to be rebuilt and restarted
    /// from the first step.
    pub async fn run(
        self,
        client: &TaskClient,
        per_step: WaitOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<SetupReport, SetupFailure> {
        self.run_observed(client, per_step, cancel, |_| {}).await
    }

    /// Like [`run`](Self::run), reporting state transitions to `observer`.
    ///
    /// A failed feature update is returned before any step starts, labelled
    /// [`FEATURES_STEP`]; the observer sees no transition in that case.
    pub async fn run_observed<O>(
        self,
        client: &TaskClient,
        per_step: WaitOptions,
        cancel: Option<&CancellationToken>,
        observer: O,
    ) -> Result<SetupReport, SetupFailure>
    where
        O: FnMut(PipelineState),
    {
        if !self.experimental_features.is_empty() {
            if let Err(cause) = client
                .update_experimental_features(&self.experimental_features)
                .await
            {
                warn!(error = %cause, "enabling experimental features failed");
                return Err(SetupFailure {
                    step: FEATURES_STEP.to_string(),
                    step_index: 0,
                    completed: Vec::new(),
                    cause,
                });
            }
        }

        let steps = self.into_steps(client, per_step, cancel);
        run_steps_observed(steps, observer).await
    }

    /// Turn every mutation into a generic [`Step`] bound to `client`.
    pub fn into_steps(
        self,
        client: &TaskClient,
        per_step: WaitOptions,
        cancel: Option<&CancellationToken>,
    ) -> Vec<Step> {
        self.steps
            .into_iter()
            .map(|MutationStep { label, mutation }| {
                let client = client.clone();
                let cancel = cancel.cloned();
                Step::new(label, move || async move {
                    client.execute(&mutation, per_step, cancel.as_ref()).await
                })
            })
            .collect()
    }
}
