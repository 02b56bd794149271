//! Boundary between the task core and the indexing service.
//!
//! The core only needs two calls from the service: submit a mutation and get
//! back an [`EnqueuedTask`], and fetch a task snapshot by uid. Listing indexes
//! is added for teardown, and toggling experimental features for setups that
//! need them (e.g. `vectorStore` before similar search). Implementations:
//!
//! - [`HttpTransport`] - reqwest over the service's REST API
//! - [`ScriptedTransport`] - scripted in-memory fake for tests
//!
//! Errors from these calls are surfaced unchanged and never retried here.

mod rest;
mod scripted;

pub use self::rest::HttpTransport;
pub use self::scripted::{ScriptedTransport, TaskScript};

use async_trait::async_trait;
use http::Method;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::{EnqueuedTask, IndexSummary, Settings, TaskInfo, TaskType};

/// Request/response access to the service's task API.
#[async_trait]
pub trait TaskTransport: Send + Sync {
    /// Issue one mutation. Exactly one remote write happens per call.
    async fn submit(&self, mutation: &Mutation) -> Result<EnqueuedTask>;

    /// Fetch the current snapshot of task `task_uid`.
    async fn fetch_task(&self, task_uid: u64) -> Result<TaskInfo>;

    /// First page of indexes, at most `limit` entries.
    async fn list_indexes(&self, limit: usize) -> Result<Vec<IndexSummary>>;

    /// Toggle experimental features and return the resulting feature map.
    ///
    /// Applied synchronously by the service; no task is created.
    async fn update_experimental_features(
        &self,
        features: &Map<String, Value>,
    ) -> Result<Map<String, Value>>;
}

/// A mutating request against the service.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// `POST /indexes`
    CreateIndex {
        /// New index uid.
        uid: String,
        /// Primary key attribute, inferred by the service when `None`.
        primary_key: Option<String>,
    },
    /// `POST /indexes/{uid}/documents`
    AddDocuments {
        /// Target index, created on the fly by the service if missing.
        index_uid: String,
        /// Documents as JSON objects.
        documents: Vec<Value>,
        /// Primary key attribute for a new index.
        primary_key: Option<String>,
    },
    /// `PATCH /indexes/{uid}/settings`
    UpdateSettings {
        /// Target index.
        index_uid: String,
        /// Settings to change.
        settings: Settings,
    },
    /// `DELETE /indexes/{uid}`
    DeleteIndex {
        /// Index to delete.
        uid: String,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateIndexBody<'a> {
    uid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    primary_key: Option<&'a str>,
}

impl Mutation {
    /// Index the mutation applies to.
    pub fn index_uid(&self) -> &str {
        match self {
            Self::CreateIndex { uid, .. } | Self::DeleteIndex { uid } => uid,
            Self::AddDocuments { index_uid, .. } | Self::UpdateSettings { index_uid, .. } => {
                index_uid
            },
        }
    }

    /// Task kind the service will report for this mutation.
    pub fn task_type(&self) -> TaskType {
        match self {
            Self::CreateIndex { .. } => TaskType::IndexCreation,
            Self::AddDocuments { .. } => TaskType::DocumentAdditionOrUpdate,
            Self::UpdateSettings { .. } => TaskType::SettingsUpdate,
            Self::DeleteIndex { .. } => TaskType::IndexDeletion,
        }
    }

    /// HTTP method of the endpoint.
    pub fn method(&self) -> Method {
        match self {
            Self::CreateIndex { .. } | Self::AddDocuments { .. } => Method::POST,
            Self::UpdateSettings { .. } => Method::PATCH,
            Self::DeleteIndex { .. } => Method::DELETE,
        }
    }

    /// Path segments of the endpoint, relative to the base URL.
    pub fn path_segments(&self) -> Vec<&str> {
        match self {
            Self::CreateIndex { .. } => vec!["indexes"],
            Self::AddDocuments { index_uid, .. } => {
                vec!["indexes", index_uid.as_str(), "documents"]
            },
            Self::UpdateSettings { index_uid, .. } => {
                vec!["indexes", index_uid.as_str(), "settings"]
            },
            Self::DeleteIndex { uid } => vec!["indexes", uid.as_str()],
        }
    }

    /// Query parameters of the endpoint.
    pub fn query(&self) -> Option<(&'static str, &str)> {
        match self {
            Self::AddDocuments {
                primary_key: Some(key),
                ..
            } => Some(("primaryKey", key.as_str())),
            _ => None,
        }
    }

    /// JSON request body, if the endpoint takes one.
    pub fn body(&self) -> Result<Option<Value>> {
        let body = match self {
            Self::CreateIndex { uid, primary_key } => Some(serde_json::to_value(CreateIndexBody {
                uid,
                primary_key: primary_key.as_deref(),
            })?),
            Self::AddDocuments { documents, .. } => Some(Value::Array(documents.clone())),
            Self::UpdateSettings { settings, .. } => Some(serde_json::to_value(settings)?),
            Self::DeleteIndex { .. } => None,
        };
        Ok(body)
    }

    /// Short description used in logs and step labels.
    pub fn describe(&self) -> String {
        match self {
            Self::CreateIndex { uid, .. } => format!("create index '{uid}'"),
            Self::AddDocuments {
                index_uid,
                documents,
                ..
            } => format!("add {} documents to '{index_uid}'", documents.len()),
            Self::UpdateSettings { index_uid, .. } => format!("update settings of '{index_uid}'"),
            Self::DeleteIndex { uid } => format!("delete index '{uid}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_index_endpoint() {
        let mutation = Mutation::CreateIndex {
            uid: "movies".to_string(),
            primary_key: Some("id".to_string()),
        };
        assert_eq!(mutation.method(), Method::POST);
        assert_eq!(mutation.path_segments(), vec!["indexes"]);
        assert_eq!(
            mutation.body().unwrap(),
            Some(json!({ "uid": "movies", "primaryKey": "id" }))
        );
        assert_eq!(mutation.task_type(), TaskType::IndexCreation);
    }

    #[test]
    fn add_documents_endpoint_carries_primary_key_query() {
        let mutation = Mutation::AddDocuments {
            index_uid: "products".to_string(),
            documents: vec![json!({ "id": 1 }), json!({ "id": 2 })],
            primary_key: Some("id".to_string()),
        };
        assert_eq!(
            mutation.path_segments(),
            vec!["indexes", "products", "documents"]
        );
        assert_eq!(mutation.query(), Some(("primaryKey", "id")));
        assert_eq!(mutation.describe(), "add 2 documents to 'products'");
        assert_eq!(
            mutation.body().unwrap(),
            Some(json!([{ "id": 1 }, { "id": 2 }]))
        );
    }

    #[test]
    fn settings_and_delete_endpoints() {
        let settings = Mutation::UpdateSettings {
            index_uid: "movies".to_string(),
            settings: Settings::new().with_filterable_attributes(["genre"]),
        };
        assert_eq!(settings.method(), Method::PATCH);
        assert_eq!(settings.index_uid(), "movies");
        assert_eq!(
            settings.body().unwrap(),
            Some(json!({ "filterableAttributes": ["genre"] }))
        );

        let delete = Mutation::DeleteIndex {
            uid: "movies".to_string(),
        };
        assert_eq!(delete.method(), Method::DELETE);
        assert_eq!(delete.path_segments(), vec!["indexes", "movies"]);
        assert_eq!(delete.body().unwrap(), None);
        assert_eq!(delete.query(), None);
    }
}
