//! Ready-made index setups: create, ingest, configure.

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::{SetupFailure, SetupPipeline, SetupReport};
use crate::client::{to_documents, TaskClient};
use crate::error::Result;
use crate::poller::WaitOptions;
use crate::transport::Mutation;
use crate::types::Settings;

/// Experimental feature backing similar-document search.
pub const VECTOR_STORE_FEATURE: &str = "vectorStore";

/// Declarative setup of one index.
///
/// Produces up to three steps, in this order: create the index, add
/// documents, update settings. Steps with nothing to do are left out.
/// Requested experimental features are enabled before the first step.
///
/// # Example
/// ```
/// use index_tasks::pipeline::IndexSetup;
/// use serde_json::json;
///
/// let movies = vec![json!({ "id": "1", "genre": "drama" })];
/// let pipeline = IndexSetup::with_documents("movies", movies)
///     .with_filterable(["genre"])
///     .into_pipeline();
/// assert_eq!(pipeline.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSetup {
    uid: String,
    create: bool,
    primary_key: Option<String>,
    documents: Vec<Value>,
    settings: Settings,
    features: Vec<String>,
}

impl IndexSetup {
    fn blank(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            create: false,
            primary_key: None,
            documents: Vec::new(),
            settings: Settings::default(),
            features: Vec::new(),
        }
    }

    /// Explicitly create an empty index.
    pub fn empty(uid: impl Into<String>, primary_key: Option<&str>) -> Self {
        Self {
            create: true,
            primary_key: primary_key.map(str::to_string),
            ..Self::blank(uid)
        }
    }

    /// Add documents; the service creates the index on the fly.
    pub fn with_documents(uid: impl Into<String>, documents: Vec<Value>) -> Self {
        Self {
            documents,
            ..Self::blank(uid)
        }
    }

    /// Like [`with_documents`](Self::with_documents) for any serializable
    /// documents. Each one must serialize to a JSON object.
    pub fn serialize_documents<D: Serialize>(
        uid: impl Into<String>,
        documents: &[D],
    ) -> Result<Self> {
        Ok(Self::with_documents(uid, to_documents(documents)?))
    }

    /// Documents filterable on `genre`.
    pub fn faceting(uid: impl Into<String>, documents: Vec<Value>) -> Self {
        Self::with_documents(uid, documents).with_filterable(["genre"])
    }

    /// Products keyed by `id`, filterable on `product_id` for distinct search.
    pub fn distinct_products(uid: impl Into<String>, documents: Vec<Value>) -> Self {
        Self::with_documents(uid, documents)
            .with_primary_key("id")
            .with_filterable(["product_id"])
    }

    /// Products keyed by `id`, filterable on `product_id`, with the vector
    /// store enabled so similar documents can be searched.
    pub fn similar_products(uid: impl Into<String>, documents: Vec<Value>) -> Self {
        Self::distinct_products(uid, documents).enable_experimental_feature(VECTOR_STORE_FEATURE)
    }

    /// Enable experimental feature `name` before the first step.
    #[must_use]
    pub fn enable_experimental_feature(mut self, name: impl Into<String>) -> Self {
        self.features.push(name.into());
        self
    }

    /// Add a creation step before ingestion.
    #[must_use]
    pub fn create_first(mut self) -> Self {
        self.create = true;
        self
    }

    /// Primary key used for creation or ingestion.
    #[must_use]
    pub fn with_primary_key(mut self, primary_key: impl Into<String>) -> Self {
        self.primary_key = Some(primary_key.into());
        self
    }

    /// Set the filterable attributes.
    #[must_use]
    pub fn with_filterable<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings = self.settings.with_filterable_attributes(attributes);
        self
    }

    /// Replace the settings applied after ingestion.
    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Index uid.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Build the pipeline.
    pub fn into_pipeline(self) -> SetupPipeline {
        let mut pipeline = self
            .features
            .into_iter()
            .fold(SetupPipeline::new(), SetupPipeline::enable_experimental_feature);

        // With a creation step the primary key goes there, not on ingestion.
        let ingest_key = if self.create {
            pipeline = pipeline.step(Mutation::CreateIndex {
                uid: self.uid.clone(),
                primary_key: self.primary_key,
            });
            None
        } else {
            self.primary_key
        };

        if !self.documents.is_empty() {
            pipeline = pipeline.step(Mutation::AddDocuments {
                index_uid: self.uid.clone(),
                documents: self.documents,
                primary_key: ingest_key,
            });
        }
        if !self.settings.is_empty() {
            pipeline = pipeline.step(Mutation::UpdateSettings {
                index_uid: self.uid,
                settings: self.settings,
            });
        }
        pipeline
    }

    /// Build and run the pipeline.
    pub async fn run(
        self,
        client: &TaskClient,
        per_step: WaitOptions,
        cancel: Option<&CancellationToken>,
    ) -> std::result::Result<SetupReport, SetupFailure> {
        self.into_pipeline().run(client, per_step, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn empty_index_is_a_single_creation() {
        let pipeline = IndexSetup::empty("books", Some("isbn")).into_pipeline();
        assert_eq!(
            pipeline.steps()[0].mutation,
            Mutation::CreateIndex {
                uid: "books".to_string(),
                primary_key: Some("isbn".to_string()),
            }
        );
        assert_eq!(pipeline.len(), 1);
    }

    #[test]
    fn distinct_products_puts_primary_key_on_ingestion() {
        let pipeline =
            IndexSetup::distinct_products("products", vec![json!({ "id": 1, "product_id": "1" })])
                .into_pipeline();

        let steps = pipeline.steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].mutation.query(), Some(("primaryKey", "id")));
        assert_eq!(
            steps[1].mutation.body().unwrap(),
            Some(json!({ "filterableAttributes": ["product_id"] }))
        );
    }

    #[test]
    fn create_first_moves_primary_key_to_creation() {
        let pipeline = IndexSetup::faceting("movies", vec![json!({ "id": "1" })])
            .with_primary_key("id")
            .create_first()
            .into_pipeline();

        let labels: Vec<&str> = pipeline.steps().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "create index 'movies'",
                "add 1 documents to 'movies'",
                "update settings of 'movies'",
            ]
        );
        assert_eq!(pipeline.steps()[1].mutation.query(), None);
    }

    #[test]
    fn similar_products_enables_vector_store() {
        let pipeline =
            IndexSetup::similar_products("products", vec![json!({ "id": 1, "product_id": "1" })])
                .into_pipeline();

        assert_eq!(
            Value::Object(pipeline.experimental_features().clone()),
            json!({ "vectorStore": true })
        );
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.steps()[0].mutation.query(), Some(("primaryKey", "id")));
    }

    #[test]
    fn plain_recipes_enable_no_feature() {
        let pipeline = IndexSetup::faceting("movies", vec![json!({ "id": "1" })]).into_pipeline();
        assert!(pipeline.experimental_features().is_empty());
    }

    #[test]
    fn serialize_documents_rejects_scalars() {
        assert!(IndexSetup::serialize_documents("movies", &[1, 2]).is_err());

        #[derive(Serialize)]
        struct Movie {
            id: &'static str,
        }
        let setup = IndexSetup::serialize_documents("movies", &[Movie { id: "1" }]).unwrap();
        assert_eq!(setup.uid(), "movies");
        assert_eq!(setup.into_pipeline().len(), 1);
    }
}
