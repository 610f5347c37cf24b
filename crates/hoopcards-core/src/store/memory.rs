// In-process document store.
//
// Keeps collections in insertion order and computes percentiles by linear
// interpolation between closest ranks. Backs the pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use futures_util::stream;
use serde_json::Value;

use super::{
    field_number, field_text, BulkDocument, BulkFailure, BulkOutcome, Document, DocumentStore,
    DocumentStream, PercentileValues, RangeFilter, StoreError, TermFilter,
};

#[derive(Debug, Default)]
struct Collection {
    mapping: Value,
    docs: Vec<(String, Document)>,
}

impl Collection {
    fn upsert(&mut self, id: &str, source: Document) {
        match self.docs.iter_mut().find(|(existing, _)| existing == id) {
            Some((_, doc)) => *doc = source,
            None => self.docs.push((id.to_string(), source)),
        }
    }
}

/// Thread-safe in-memory implementation of [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Collection>>,
    rejected_ids: Mutex<HashSet<String>>,
    percentile_queries: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make bulk writes refuse documents with these ids.
    pub fn reject_ids<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rejected = self.rejected_ids.lock().expect("store mutex poisoned");
        rejected.extend(ids.into_iter().map(Into::into));
    }

    /// Insert documents directly, bypassing bulk write bookkeeping.
    pub fn seed(&self, collection: &str, docs: impl IntoIterator<Item = (String, Document)>) {
        let mut collections = self.collections();
        let coll = collections.entry(collection.to_string()).or_default();
        for (id, doc) in docs {
            coll.upsert(&id, doc);
        }
    }

    /// Snapshot of a collection's documents in natural order.
    pub fn documents(&self, collection: &str) -> Option<Vec<(String, Document)>> {
        self.collections().get(collection).map(|c| c.docs.clone())
    }

    /// Mapping the collection was created with.
    pub fn mapping(&self, collection: &str) -> Option<Value> {
        self.collections().get(collection).map(|c| c.mapping.clone())
    }

    /// Number of percentile aggregations served so far.
    pub fn percentile_queries(&self) -> usize {
        self.percentile_queries.load(Ordering::SeqCst)
    }

    fn collections(&self) -> MutexGuard<'_, HashMap<String, Collection>> {
        self.collections.lock().expect("store mutex poisoned")
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        self.collections().remove(name);
        Ok(())
    }

    async fn create_collection(&self, name: &str, mapping: &Value) -> Result<(), StoreError> {
        let mut collections = self.collections();
        if collections.contains_key(name) {
            return Err(StoreError::Status {
                status: 400,
                body: format!("resource_already_exists_exception: {name}"),
            });
        }
        collections.insert(
            name.to_string(),
            Collection {
                mapping: mapping.clone(),
                docs: Vec::new(),
            },
        );
        Ok(())
    }

    async fn bulk_write(
        &self,
        collection: &str,
        docs: &[BulkDocument],
    ) -> Result<BulkOutcome, StoreError> {
        let rejected = self.rejected_ids.lock().expect("store mutex poisoned").clone();
        let mut collections = self.collections();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::MissingCollection(collection.to_string()))?;

        let mut outcome = BulkOutcome::default();
        for doc in docs {
            if rejected.contains(&doc.id) {
                outcome.failures.push(BulkFailure {
                    id: doc.id.clone(),
                    reason: "document rejected".into(),
                });
                continue;
            }
            coll.upsert(&doc.id, doc.source.clone());
            outcome.written += 1;
        }
        Ok(outcome)
    }

    async fn query_percentiles(
        &self,
        collection: &str,
        field: &str,
        percents: &[f64],
        filter: Option<&RangeFilter>,
    ) -> Result<PercentileValues, StoreError> {
        self.percentile_queries.fetch_add(1, Ordering::SeqCst);
        let collections = self.collections();
        let coll = collections
            .get(collection)
            .ok_or_else(|| StoreError::MissingCollection(collection.to_string()))?;

        let mut values: Vec<f64> = coll
            .docs
            .iter()
            .filter(|(_, doc)| passes_range(doc, filter))
            .filter_map(|(_, doc)| field_number(doc, field).and_then(Result::ok))
            .collect();
        values.sort_by(f64::total_cmp);

        Ok(PercentileValues(
            percents
                .iter()
                .map(|&p| (p, interpolate(&values, p)))
                .collect(),
        ))
    }

    fn scan<'a>(&'a self, collection: &'a str, filter: TermFilter) -> DocumentStream<'a> {
        let matches: Vec<Result<Document, StoreError>> = match self.collections().get(collection) {
            Some(coll) => coll
                .docs
                .iter()
                .filter(|(_, doc)| passes_terms(doc, &filter))
                .map(|(_, doc)| Ok(doc.clone()))
                .collect(),
            None => vec![Err(StoreError::MissingCollection(collection.to_string()))],
        };
        Box::pin(stream::iter(matches))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn passes_range(doc: &Document, filter: Option<&RangeFilter>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    matches!(field_number(doc, &filter.field), Some(Ok(v)) if v > filter.gt)
}

/// Exact match; numeric text compares by value so `2017` matches `2017.0`.
fn passes_terms(doc: &Document, filter: &TermFilter) -> bool {
    filter.terms.iter().all(|(field, expected)| {
        let Some(actual) = field_text(doc, field) else {
            return false;
        };
        if actual == *expected {
            return true;
        }
        match (actual.parse::<f64>(), expected.parse::<f64>()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    })
}

/// Percentile of sorted `values` using linear interpolation between ranks.
fn interpolate(values: &[f64], percent: f64) -> Option<f64> {
    let last = values.len().checked_sub(1)?;
    let rank = (percent / 100.0).clamp(0.0, 1.0) * last as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(values[lower] + (values[upper] - values[lower]) * weight)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn bulk(id: &str, value: Value) -> BulkDocument {
        BulkDocument {
            id: id.into(),
            source: doc(value),
        }
    }

    #[test]
    fn interpolation_between_ranks() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(interpolate(&values, 0.0), Some(1.0));
        assert_eq!(interpolate(&values, 50.0), Some(3.0));
        assert_eq!(interpolate(&values, 100.0), Some(5.0));
        assert!((interpolate(&values, 90.0).unwrap() - 4.6).abs() < 1e-9);
        assert_eq!(interpolate(&[], 50.0), None);
        assert_eq!(interpolate(&[7.0], 20.0), Some(7.0));
    }

    #[tokio::test]
    async fn bulk_write_overwrites_by_id() {
        let store = MemoryStore::new();
        store.create_collection("c", &json!({})).await.unwrap();
        store
            .bulk_write("c", &[bulk("1", json!({"v": 1})), bulk("2", json!({"v": 2}))])
            .await
            .unwrap();
        let outcome = store.bulk_write("c", &[bulk("1", json!({"v": 10}))]).await.unwrap();
        assert_eq!(outcome.written, 1);

        let docs = store.documents("c").unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].0, "1");
        assert_eq!(docs[0].1["v"], json!(10));
    }

    #[tokio::test]
    async fn rejected_ids_are_reported() {
        let store = MemoryStore::new();
        store.reject_ids(["2"]);
        store.create_collection("c", &json!({})).await.unwrap();
        let outcome = store
            .bulk_write("c", &[bulk("1", json!({})), bulk("2", json!({}))])
            .await
            .unwrap();
        assert_eq!(outcome.written, 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].id, "2");
    }

    #[tokio::test]
    async fn create_existing_collection_fails_and_delete_missing_succeeds() {
        let store = MemoryStore::new();
        store.delete_collection("nope").await.unwrap();
        store.create_collection("c", &json!({"a": 1})).await.unwrap();
        assert!(store.create_collection("c", &json!({})).await.is_err());
        assert_eq!(store.mapping("c"), Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn percentiles_respect_range_filter() {
        let store = MemoryStore::new();
        store.seed(
            "c",
            vec![
                ("1".into(), doc(json!({"pct": "0.1", "att": "5"}))),
                ("2".into(), doc(json!({"pct": "0.4", "att": "25"}))),
                ("3".into(), doc(json!({"pct": "0.6", "att": "30"}))),
                ("4".into(), doc(json!({"att": "50"}))),
            ],
        );
        let filter = RangeFilter::greater_than("att", 20.0);
        let values = store
            .query_percentiles("c", "pct", &[0.0, 100.0], Some(&filter))
            .await
            .unwrap();
        assert_eq!(values.get(0.0), Some(0.4));
        assert_eq!(values.get(100.0), Some(0.6));

        let unfiltered = store
            .query_percentiles("c", "pct", &[0.0], None)
            .await
            .unwrap();
        assert_eq!(unfiltered.get(0.0), Some(0.1));
        assert_eq!(store.percentile_queries(), 2);
    }

    #[tokio::test]
    async fn scan_matches_numeric_terms_by_value() {
        let store = MemoryStore::new();
        store.seed(
            "c",
            vec![
                ("1".into(), doc(json!({"name": "A", "Season": "2016.0"}))),
                ("2".into(), doc(json!({"name": "A", "Season": "2017.0"}))),
                ("3".into(), doc(json!({"name": "B", "Season": "2017.0"}))),
            ],
        );
        let filter = TermFilter::new().term("name", "A").term("Season", "2017");
        let docs: Vec<Document> = store.scan("c", filter).try_collect().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["Season"], json!("2017.0"));
    }

    #[tokio::test]
    async fn scan_of_missing_collection_errors() {
        let store = MemoryStore::new();
        let result: Result<Vec<Document>, _> =
            store.scan("none", TermFilter::new()).try_collect().await;
        assert!(matches!(result, Err(StoreError::MissingCollection(_))));
    }
}
