//! Task synchronization and setup pipelines for an asynchronous
//! document-indexing service.
//!
//! Every mutating call to the service (create an index, add documents,
//! change settings, delete an index) is accepted immediately and performed
//! later as a *task*. This crate submits those mutations, polls their tasks
//! until they are terminal, and chains dependent mutations into
//! all-or-nothing setup pipelines.
//!
//! # Module Organization
//!
//! - [`types`] - task snapshots, statuses, settings and query payloads
//! - [`transport`] - the submit/fetch boundary and its HTTP implementation
//! - [`poller`] - fixed-interval waiting with timeout and cancellation
//! - [`client`] - mutations with optional completion waiting
//! - [`pipeline`] - ordered setup steps that stop at the first failure
//! - [`clock`] - injectable time source
//! - [`config`] - TOML and environment configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use index_tasks::pipeline::IndexSetup;
//! use index_tasks::{ClientConfig, TaskClient};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let client = TaskClient::from_config(&config)?;
//!
//! IndexSetup::faceting("movies", vec![json!({ "id": "1", "genre": "drama" })])
//!     .run(&client, config.wait_options(), None)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod poller;
pub mod transport;
pub mod types;

#[cfg(feature = "logging")]
pub mod logging;

pub use client::{Completion, TaskClient, TaskHandle};
pub use config::ClientConfig;
pub use error::{Error, Result, TransportError};
pub use pipeline::{IndexSetup, SetupFailure, SetupPipeline, SetupReport};
pub use poller::{TaskPoller, WaitOptions};
pub use transport::{HttpTransport, Mutation, TaskTransport};
pub use types::{
    EnqueuedTask, Settings, SimilarQuery, SimilarResults, TaskErrorPayload, TaskInfo, TaskStatus,
    TaskType,
};

#[cfg(feature = "logging")]
pub use logging::init_logging;

// Re-export for callers passing cancellation tokens.
pub use tokio_util::sync::CancellationToken;
