// Elasticsearch implementation of `DocumentStore` over the REST API.
//
// Every request is issued and awaited on its own; retryable failures
// (timeouts, refused connections, 429/502/503/504) are reissued with
// exponential backoff according to the configured `RetryPolicy`.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{stream, TryStreamExt};
use hoopcards_core::config::{CredentialsConfig, StoreConfig};
use hoopcards_core::store::{
    BulkDocument, BulkOutcome, Document, DocumentStore, DocumentStream, PercentileValues,
    RangeFilter, StoreError, TermFilter,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder};
use serde_json::{json, Value};
use tracing::debug;

use crate::query::{
    bulk_body, parse_bulk_response, parse_percentiles, parse_scroll_page, percentiles_body,
    scan_body,
};
use crate::retry::{with_retry, RetryPolicy};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Documents per scroll page.
pub const SCROLL_PAGE_SIZE: usize = 500;

/// How long the server keeps a scroll context alive between pages.
const SCROLL_KEEP_ALIVE: &str = "1m";

// ---------------------------------------------------------------------------
// EsStore
// ---------------------------------------------------------------------------

/// Elasticsearch-backed document store. Collections are indices.
pub struct EsStore {
    http: reqwest::Client,
    base_url: String,
    auth: Option<(String, String)>,
    retry: RetryPolicy,
}

/// Position in a scroll over search results.
enum Scroll {
    Start(Value),
    Next(String),
    Done,
}

impl EsStore {
    /// Client for `base_url` with reqwest defaults and the default retry
    /// policy.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            auth: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Build a client from the `[store]` section and optional credentials.
    pub fn from_config(
        store: &StoreConfig,
        credentials: &CredentialsConfig,
    ) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(store.timeout_secs))
            .danger_accept_invalid_certs(!store.verify_certs)
            .build()
            .map_err(|e| StoreError::Connection(format!("failed to build HTTP client: {e}")))?;

        let mut es = Self::with_client(http, store.url.clone()).with_retry_policy(RetryPolicy {
            max_retries: store.max_retries,
            initial_backoff: Duration::from_millis(store.retry_backoff_ms),
        });
        if let (Some(user), Some(password)) = (&credentials.username, &credentials.password) {
            es.auth = Some((user.clone(), password.clone()));
        }
        Ok(es)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.auth {
            Some((user, password)) => request.basic_auth(user, Some(password)),
            None => request,
        }
    }

    /// Send the request produced by `build`, retrying per policy, and parse
    /// the JSON response body. Non-2xx answers become `StoreError::Status`.
    async fn send_json<F>(&self, what: &str, build: F) -> Result<Value, StoreError>
    where
        F: Fn() -> RequestBuilder,
    {
        with_retry(self.retry, what, || {
            let request = build();
            async move {
                let response = request.send().await.map_err(request_error)?;
                let status = response.status();
                let text = response.text().await.map_err(request_error)?;
                if !status.is_success() {
                    return Err(StoreError::Status {
                        status: status.as_u16(),
                        body: text,
                    });
                }
                if text.trim().is_empty() {
                    return Ok(Value::Null);
                }
                Ok(serde_json::from_str(&text)?)
            }
        })
        .await
    }

    /// Release a scroll context. Failures are logged and dropped.
    async fn clear_scroll(&self, scroll_id: &str) {
        let body = json!({ "scroll_id": scroll_id });
        let result = self
            .send_json("clear scroll", || {
                self.request(Method::DELETE, "/_search/scroll").json(&body)
            })
            .await;
        if let Err(e) = result {
            debug!("Failed to clear scroll: {}", e);
        }
    }

    async fn scroll_page(
        &self,
        collection: &str,
        state: Scroll,
    ) -> Result<Option<(Vec<Document>, Scroll)>, StoreError> {
        let body = match state {
            Scroll::Start(query) => {
                let path = format!("/{collection}/_search?scroll={SCROLL_KEEP_ALIVE}");
                self.send_json("scan", || self.request(Method::POST, &path).json(&query))
                    .await
                    .map_err(|e| missing_collection(e, collection))?
            }
            Scroll::Next(scroll_id) => {
                let next = json!({ "scroll": SCROLL_KEEP_ALIVE, "scroll_id": scroll_id });
                self.send_json("scroll", || {
                    self.request(Method::POST, "/_search/scroll").json(&next)
                })
                .await?
            }
            Scroll::Done => return Ok(None),
        };

        let page = parse_scroll_page(body)?;
        debug!("Scroll page of {} documents from {}", page.docs.len(), collection);
        match (page.docs.is_empty(), page.scroll_id) {
            (true, Some(scroll_id)) => {
                self.clear_scroll(&scroll_id).await;
                Ok(None)
            }
            (true, None) => Ok(None),
            (false, Some(scroll_id)) => Ok(Some((page.docs, Scroll::Next(scroll_id)))),
            (false, None) => Ok(Some((page.docs, Scroll::Done))),
        }
    }
}

#[async_trait]
impl DocumentStore for EsStore {
    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        let path = format!("/{name}");
        match self
            .send_json("delete index", || self.request(Method::DELETE, &path))
            .await
        {
            Ok(_) => {
                debug!("Deleted index {}", name);
                Ok(())
            }
            // 404: no such index. 400: the name is not an index (alias or invalid).
            Err(StoreError::Status { status: 404 | 400, .. }) => {
                debug!("Index {} not present, nothing to delete", name);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn create_collection(&self, name: &str, mapping: &Value) -> Result<(), StoreError> {
        let path = format!("/{name}");
        self.send_json("create index", || {
            self.request(Method::PUT, &path).json(mapping)
        })
        .await?;
        debug!("Created index {}", name);
        Ok(())
    }

    async fn bulk_write(
        &self,
        collection: &str,
        docs: &[BulkDocument],
    ) -> Result<BulkOutcome, StoreError> {
        if docs.is_empty() {
            return Ok(BulkOutcome::default());
        }
        let body = bulk_body(collection, docs)?;
        let response = self
            .send_json("bulk write", || {
                self.request(Method::POST, "/_bulk")
                    .header(CONTENT_TYPE, "application/x-ndjson")
                    .body(body.clone())
            })
            .await?;
        parse_bulk_response(response)
    }

    async fn query_percentiles(
        &self,
        collection: &str,
        field: &str,
        percents: &[f64],
        filter: Option<&RangeFilter>,
    ) -> Result<PercentileValues, StoreError> {
        let path = format!("/{collection}/_search");
        let body = percentiles_body(field, percents, filter);
        let response = self
            .send_json("percentiles", || self.request(Method::POST, &path).json(&body))
            .await
            .map_err(|e| missing_collection(e, collection))?;
        parse_percentiles(&response, percents)
    }

    fn scan<'a>(&'a self, collection: &'a str, filter: TermFilter) -> DocumentStream<'a> {
        let start = Scroll::Start(scan_body(&filter, SCROLL_PAGE_SIZE));
        let pages = stream::try_unfold(start, move |state| self.scroll_page(collection, state));
        Box::pin(
            pages
                .map_ok(|docs| stream::iter(docs.into_iter().map(Ok::<_, StoreError>)))
                .try_flatten(),
        )
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn request_error(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout(e.to_string())
    } else if e.is_decode() || e.is_body() {
        StoreError::UnexpectedResponse(e.to_string())
    } else {
        StoreError::Connection(e.to_string())
    }
}

fn missing_collection(e: StoreError, collection: &str) -> StoreError {
    match e {
        StoreError::Status { status: 404, .. } => {
            StoreError::MissingCollection(collection.to_string())
        }
        other => other,
    }
}
