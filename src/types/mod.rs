//! Wire types exchanged with the indexing service.
//!
//! - [`task`] - task snapshots, statuses and error payloads
//! - [`settings`] - index settings payload
//! - [`similar`] - similar-documents query and results

pub mod settings;
pub mod similar;
pub mod task;

use serde::{Deserialize, Serialize};

pub use settings::Settings;
pub use similar::{SimilarQuery, SimilarResults};
pub use task::{EnqueuedTask, TaskErrorPayload, TaskInfo, TaskStatus, TaskType};

/// One entry of `GET /indexes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSummary {
    /// Index identifier.
    pub uid: String,

    /// Primary key attribute, once known.
    #[serde(default)]
    pub primary_key: Option<String>,

    /// ISO 8601 creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// ISO 8601 last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl IndexSummary {
    /// Summary with only a uid and primary key.
    pub fn new(uid: impl Into<String>, primary_key: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            primary_key,
            created_at: None,
            updated_at: None,
        }
    }
}

/// A page of `GET /indexes`. Only the first page is ever requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexPage {
    /// Indexes on this page.
    pub results: Vec<IndexSummary>,
    /// Offset of this page.
    #[serde(default)]
    pub offset: usize,
    /// Page size requested.
    #[serde(default)]
    pub limit: usize,
    /// Total number of indexes.
    #[serde(default)]
    pub total: usize,
}
