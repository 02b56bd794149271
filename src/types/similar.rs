//! Request and response bodies for `POST /indexes/{uid}/similar`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Query for documents similar to a target document.
///
/// # Examples
///
/// ```
/// use index_tasks::SimilarQuery;
///
/// let query = SimilarQuery::new("143").unwrap().with_embedder("default").with_limit(5);
/// let json = serde_json::to_value(&query).unwrap();
/// assert_eq!(json["id"], "143");
/// assert_eq!(json["limit"], 5);
///
/// assert!(SimilarQuery::new("   ").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarQuery {
    /// Identifier of the target document.
    pub id: String,

    /// Embedder used to compute recommendations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedder: Option<String>,

    /// Filter expression, string or nested array form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,

    /// Attributes to return in each hit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes_to_retrieve: Option<Vec<String>>,

    /// Number of hits to skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,

    /// Maximum number of hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Include the global ranking score of each hit.
    #[serde(default)]
    pub show_ranking_score: bool,

    /// Include the detailed ranking score of each hit.
    #[serde(default)]
    pub show_ranking_score_details: bool,

    /// Drop hits ranked below this score (0.0 to 1.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking_score_threshold: Option<f64>,

    /// Include the vector data of each hit.
    #[serde(default)]
    pub retrieve_vectors: bool,
}

impl SimilarQuery {
    /// Create a query targeting document `id`.
    ///
    /// Fails with [`Error::InvalidArgument`] when `id` is empty or only
    /// whitespace.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "similar query id cannot be empty or only whitespace".to_string(),
            ));
        }

        Ok(Self {
            id,
            embedder: None,
            filter: None,
            attributes_to_retrieve: None,
            offset: None,
            limit: None,
            show_ranking_score: false,
            show_ranking_score_details: false,
            ranking_score_threshold: None,
            retrieve_vectors: false,
        })
    }

    /// Use the named embedder.
    #[must_use]
    pub fn with_embedder(mut self, embedder: impl Into<String>) -> Self {
        self.embedder = Some(embedder.into());
        self
    }

    /// Apply a filter expression.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<Value>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Cap the number of hits.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first `offset` hits.
    #[must_use]
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Drop hits below `threshold`; must lie in `0.0..=1.0`.
    pub fn with_ranking_score_threshold(mut self, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidArgument(format!(
                "ranking score threshold must be between 0.0 and 1.0, got {threshold}"
            )));
        }
        self.ranking_score_threshold = Some(threshold);
        Ok(self)
    }
}

/// Response to a similar-documents query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarResults {
    /// Matching documents.
    pub hits: Vec<Value>,

    /// Identifier of the target document.
    pub id: String,

    /// Server-side processing time.
    #[serde(rename = "processingTimeMs")]
    pub processing_time_ms: u64,

    /// Limit applied.
    #[serde(default)]
    pub limit: Option<u32>,

    /// Offset applied.
    #[serde(default)]
    pub offset: Option<u32>,

    /// Estimated number of similar documents.
    #[serde(default)]
    pub estimated_total_hits: Option<u64>,
}
