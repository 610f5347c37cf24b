// Document store abstraction.
//
// The pipelines only need five operations from the backing search engine:
// drop and create a collection, bulk index keyed documents, compute
// percentiles of one numeric field, and stream documents matching exact terms.

pub mod memory;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use memory::MemoryStore;

/// A stored document: field name -> JSON value.
pub type Document = serde_json::Map<String, Value>;

/// Lazily paged sequence of documents returned by [`DocumentStore::scan`].
pub type DocumentStream<'a> = BoxStream<'a, Result<Document, StoreError>>;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("collection `{0}` does not exist")]
    MissingCollection(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether reissuing the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Timeout(_) | StoreError::Connection(_) => true,
            StoreError::Status { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Query and write types
// ---------------------------------------------------------------------------

/// Numeric range predicate: `field > gt`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeFilter {
    pub field: String,
    pub gt: f64,
}

impl RangeFilter {
    pub fn greater_than(field: impl Into<String>, gt: f64) -> Self {
        Self {
            field: field.into(),
            gt,
        }
    }
}

/// Conjunction of exact-match predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermFilter {
    pub terms: Vec<(String, String)>,
}

impl TermFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exact-match predicate on `field`.
    pub fn term(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.terms.push((field.into(), value.into()));
        self
    }
}

/// A document to index under a caller-chosen identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkDocument {
    pub id: String,
    pub source: Document,
}

/// A document the store refused during a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkFailure {
    pub id: String,
    pub reason: String,
}

/// Per-request result of a bulk write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkOutcome {
    pub written: usize,
    pub failures: Vec<BulkFailure>,
}

/// Percentile values keyed by the requested percent. A value is `None` when
/// the store had no population to compute it from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PercentileValues(pub Vec<(f64, Option<f64>)>);

impl PercentileValues {
    /// Value at `percent`, if requested and computed.
    pub fn get(&self, percent: f64) -> Option<f64> {
        self.0
            .iter()
            .find(|(p, _)| (p - percent).abs() < 1e-9)
            .and_then(|(_, v)| *v)
    }
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Drop a collection. Succeeds when the collection does not exist.
    async fn delete_collection(&self, name: &str) -> Result<(), StoreError>;

    /// Create a collection with the given mapping document.
    async fn create_collection(&self, name: &str, mapping: &Value) -> Result<(), StoreError>;

    /// Index `docs` in one request, overwriting documents with the same id.
    async fn bulk_write(
        &self,
        collection: &str,
        docs: &[BulkDocument],
    ) -> Result<BulkOutcome, StoreError>;

    /// Percentiles of a numeric `field` over documents passing `filter`.
    async fn query_percentiles(
        &self,
        collection: &str,
        field: &str,
        percents: &[f64],
        filter: Option<&RangeFilter>,
    ) -> Result<PercentileValues, StoreError>;

    /// Stream every document matching `filter`, in the store's natural order.
    fn scan<'a>(&'a self, collection: &'a str, filter: TermFilter) -> DocumentStream<'a>;
}

// ---------------------------------------------------------------------------
// Document field helpers
// ---------------------------------------------------------------------------

/// Read a field as text. Numbers are rendered with their JSON formatting.
pub fn field_text(doc: &Document, field: &str) -> Option<String> {
    match doc.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read a field as a number, parsing string values.
///
/// Returns `Some(Err(text))` when the field is present but not a finite
/// number (`"nan"` and `"inf"` included).
pub fn field_number(doc: &Document, field: &str) -> Option<Result<f64, String>> {
    match doc.get(field)? {
        Value::Number(n) => Some(n.as_f64().ok_or_else(|| n.to_string())),
        Value::String(s) => Some(
            s.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| s.clone()),
        ),
        Value::Null => None,
        other => Some(Err(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn percentile_lookup_by_percent() {
        let values = PercentileValues(vec![(20.0, Some(1.5)), (50.0, None), (90.0, Some(9.0))]);
        assert_eq!(values.get(20.0), Some(1.5));
        assert_eq!(values.get(50.0), None);
        assert_eq!(values.get(90.0), Some(9.0));
        assert_eq!(values.get(10.0), None);
    }

    #[test]
    fn numbers_parse_from_strings_and_numbers() {
        let d = doc(json!({"a": "0.455", "b": 12, "c": "", "d": null, "e": "n/a"}));
        assert_eq!(field_number(&d, "a"), Some(Ok(0.455)));
        assert_eq!(field_number(&d, "b"), Some(Ok(12.0)));
        assert_eq!(field_number(&d, "c"), Some(Err(String::new())));
        assert_eq!(field_number(&d, "d"), None);
        assert_eq!(field_number(&d, "e"), Some(Err("n/a".into())));
        assert_eq!(field_number(&d, "missing"), None);
    }

    #[test]
    fn non_finite_text_is_not_a_number() {
        let d = doc(json!({"a": "NaN", "b": "inf", "c": "-infinity"}));
        assert_eq!(field_number(&d, "a"), Some(Err("NaN".into())));
        assert_eq!(field_number(&d, "b"), Some(Err("inf".into())));
        assert_eq!(field_number(&d, "c"), Some(Err("-infinity".into())));
    }

    #[test]
    fn text_renders_numbers() {
        let d = doc(json!({"Season": 2017, "Team": "GSW", "Age": "28.0"}));
        assert_eq!(field_text(&d, "Season").as_deref(), Some("2017"));
        assert_eq!(field_text(&d, "Team").as_deref(), Some("GSW"));
        assert_eq!(field_text(&d, "Age").as_deref(), Some("28.0"));
        assert_eq!(field_text(&d, "Pos"), None);
    }

    #[test]
    fn retryable_errors() {
        assert!(StoreError::Timeout("t".into()).is_retryable());
        assert!(StoreError::Connection("c".into()).is_retryable());
        assert!(StoreError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(!StoreError::Status { status: 400, body: String::new() }.is_retryable());
        assert!(!StoreError::MissingCollection("x".into()).is_retryable());
    }
}
