//! reqwest-backed [`TaskTransport`] for the service's REST API.

use async_trait::async_trait;
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use super::{Mutation, TaskTransport};
use crate::config::ClientConfig;
use crate::error::{Result, TransportError};
use crate::types::{
    EnqueuedTask, IndexPage, IndexSummary, SimilarQuery, SimilarResults, TaskInfo,
};

/// HTTP transport speaking JSON to the indexing service.
///
/// Sends `Authorization: Bearer <api key>` when a key is configured and the
/// configured `User-Agent` on every request. Non-2xx answers become
/// [`TransportError::Status`] with the raw body preserved.
///
/// # Example
///
/// ```rust,no_run
/// use index_tasks::{ClientConfig, HttpTransport};
///
/// let config = ClientConfig::new("http://localhost:7700").with_api_key("masterKey");
/// let transport = HttpTransport::new(&config)?;
/// assert_eq!(transport.base_url().as_str(), "http://localhost:7700/");
/// # Ok::<(), index_tasks::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport and its HTTP client from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(TransportError::Request)?;
        Self::with_http_client(config, http_client)
    }

    /// Build a transport around an existing reqwest client.
    ///
    /// The client's own timeout and user agent are used as-is.
    pub fn with_http_client(config: &ClientConfig, http_client: reqwest::Client) -> Result<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", config.url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                config.url
            ))
            .into());
        }

        Ok(Self {
            base_url,
            api_key: config.api_key.clone(),
            http_client,
        })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Find documents similar to `query.id` in `index_uid`.
    ///
    /// Read-only: no task is created.
    pub async fn search_similar(
        &self,
        index_uid: &str,
        query: &SimilarQuery,
    ) -> Result<SimilarResults> {
        let url = self.endpoint(&["indexes", index_uid, "similar"], None)?;
        let body = serde_json::to_value(query)?;
        self.send(Method::POST, url, Some(&body)).await
    }

    fn endpoint(&self, segments: &[&str], query: Option<(&str, &str)>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| TransportError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        if let Some((key, value)) = query {
            url.query_pairs_mut().append_pair(key, value);
        }
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<T> {
        let path = url.path().to_string();
        debug!(method = %method, path = %path, "sending request");

        let mut request = self.http_client.request(method.clone(), url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(request_error)?;
        let status = response.status();
        let text = response.text().await.map_err(TransportError::Request)?;

        if !status.is_success() {
            return Err(TransportError::Status {
                method: method.to_string(),
                path,
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        serde_json::from_str(&text).map_err(|source| TransportError::Decode { path, source }.into())
    }
}

#[async_trait]
impl TaskTransport for HttpTransport {
    async fn submit(&self, mutation: &Mutation) -> Result<EnqueuedTask> {
        let url = self.endpoint(&mutation.path_segments(), mutation.query())?;
        let body = mutation.body()?;
        self.send(mutation.method(), url, body.as_ref()).await
    }

    async fn fetch_task(&self, task_uid: u64) -> Result<TaskInfo> {
        let uid = task_uid.to_string();
        let url = self.endpoint(&["tasks", uid.as_str()], None)?;
        self.send(Method::GET, url, None).await
    }

    async fn list_indexes(&self, limit: usize) -> Result<Vec<IndexSummary>> {
        let limit = limit.to_string();
        let url = self.endpoint(&["indexes"], Some(("limit", limit.as_str())))?;
        let page: IndexPage = self.send(Method::GET, url, None).await?;
        Ok(page.results)
    }

    async fn update_experimental_features(
        &self,
        features: &Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let url = self.endpoint(&["experimental-features"], None)?;
        let body = Value::Object(features.clone());
        self.send(Method::PATCH, url, Some(&body)).await
    }
}

/// Connection failures mean the service is unreachable; anything else is
/// reported as a request failure.
fn request_error(err: reqwest::Error) -> TransportError {
    if err.is_connect() {
        TransportError::Unavailable(err.to_string())
    } else {
        TransportError::Request(err)
    }
}
