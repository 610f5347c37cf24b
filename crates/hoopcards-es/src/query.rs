// Elasticsearch request bodies and response parsing.
//
// Everything here is pure so the wire format can be tested without a server.

use hoopcards_core::store::{
    BulkDocument, BulkFailure, BulkOutcome, Document, PercentileValues, RangeFilter, StoreError,
    TermFilter,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// Name of the percentiles aggregation in search requests and responses.
const PERCENTILES_AGG: &str = "percentiles";

// ---------------------------------------------------------------------------
// Bulk
// ---------------------------------------------------------------------------

/// NDJSON body for `POST /_bulk`: an `index` action line followed by the
/// source line for each document. Ends with the newline the API requires.
pub fn bulk_body(collection: &str, docs: &[BulkDocument]) -> Result<String, StoreError> {
    let mut body = String::new();
    for doc in docs {
        let action = json!({ "index": { "_index": collection, "_id": doc.id } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&doc.source)?);
        body.push('\n');
    }
    Ok(body)
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<BulkItem>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    index: Option<BulkItemResult>,
}

#[derive(Debug, Deserialize)]
struct BulkItemResult {
    #[serde(rename = "_id", default)]
    id: String,
    #[serde(default)]
    error: Option<Value>,
}

/// Split a bulk response into written and refused documents.
pub fn parse_bulk_response(body: Value) -> Result<BulkOutcome, StoreError> {
    let response: BulkResponse = serde_json::from_value(body)?;
    let mut outcome = BulkOutcome::default();
    for item in response.items {
        let Some(result) = item.index else {
            return Err(StoreError::UnexpectedResponse(
                "bulk item without an index result".into(),
            ));
        };
        match result.error {
            Some(error) => outcome.failures.push(BulkFailure {
                id: result.id,
                reason: error_reason(&error),
            }),
            None => outcome.written += 1,
        }
    }
    Ok(outcome)
}

fn error_reason(error: &Value) -> String {
    let kind = error.get("type").and_then(Value::as_str);
    let reason = error.get("reason").and_then(Value::as_str);
    match (kind, reason) {
        (Some(kind), Some(reason)) => format!("{kind}: {reason}"),
        (None, Some(reason)) => reason.to_string(),
        _ => error.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Percentiles
// ---------------------------------------------------------------------------

/// Body for a size-0 search computing percentiles of `field`.
pub fn percentiles_body(field: &str, percents: &[f64], filter: Option<&RangeFilter>) -> Value {
    let mut body = json!({
        "size": 0,
        "aggs": {
            PERCENTILES_AGG: {
                "percentiles": { "field": field, "percents": percents }
            }
        }
    });
    if let Some(filter) = filter {
        body["query"] = json!({
            "bool": {
                "filter": [ { "range": { filter.field.as_str(): { "gt": filter.gt } } } ]
            }
        });
    }
    body
}

/// Read `aggregations.percentiles.values` back into requested-percent order.
///
/// Keys come back as decimal strings (`"20.0"`); a `null` value means the
/// filtered population had no values for the field.
pub fn parse_percentiles(body: &Value, percents: &[f64]) -> Result<PercentileValues, StoreError> {
    let values = body
        .pointer(&format!("/aggregations/{PERCENTILES_AGG}/values"))
        .and_then(Value::as_object)
        .ok_or_else(|| {
            StoreError::UnexpectedResponse("missing percentiles aggregation values".into())
        })?;

    let parsed: Vec<(f64, Option<f64>)> = values
        .iter()
        .filter_map(|(key, value)| key.parse::<f64>().ok().map(|p| (p, value.as_f64())))
        .collect();

    Ok(PercentileValues(
        percents
            .iter()
            .map(|&percent| {
                let value = parsed
                    .iter()
                    .find(|(p, _)| (p - percent).abs() < 1e-9)
                    .and_then(|(_, v)| *v);
                (percent, value)
            })
            .collect(),
    ))
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// Body for the first page of a scroll over documents matching `filter`.
pub fn scan_body(filter: &TermFilter, page_size: usize) -> Value {
    let terms: Vec<Value> = filter
        .terms
        .iter()
        .map(|(field, value)| json!({ "term": { field.as_str(): value } }))
        .collect();
    json!({
        "size": page_size,
        "sort": ["_doc"],
        "query": { "bool": { "filter": terms } }
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "_scroll_id")]
    scroll_id: Option<String>,
    hits: Hits,
}

#[derive(Debug, Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: Document,
}

/// One page of scroll results.
#[derive(Debug, Default, PartialEq)]
pub struct ScrollPage {
    pub scroll_id: Option<String>,
    pub docs: Vec<Document>,
}

pub fn parse_scroll_page(body: Value) -> Result<ScrollPage, StoreError> {
    let response: SearchResponse = serde_json::from_value(body)?;
    Ok(ScrollPage {
        scroll_id: response.scroll_id,
        docs: response.hits.hits.into_iter().map(|hit| hit.source).collect(),
    })
}
