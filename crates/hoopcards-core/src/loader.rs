// Season stats loader: CSV rows -> sparse documents -> freshly created collection.

use std::io::Read;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::schema::{stored_field, CSV_ID, PLACEHOLDER_COLUMNS, SOURCE_ID_COLUMN};
use crate::store::{BulkDocument, Document, DocumentStore, StoreError};

/// Documents per bulk request unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path} has no unlabeled id column")]
    MissingIdColumn { path: String },

    #[error("mapping {path} is not valid JSON: {source}")]
    Mapping {
        path: String,
        source: serde_json::Error,
    },

    #[error("failed to {action} collection `{collection}`: {source}")]
    Store {
        action: &'static str,
        collection: String,
        source: StoreError,
    },

    #[error("chunk {chunk} had {rejected} rejected document(s), first: {first_reason}")]
    ChunkFailed {
        chunk: usize,
        rejected: usize,
        first_reason: String,
    },
}

/// What a completed load wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub chunks: usize,
    pub written: usize,
}

// ---------------------------------------------------------------------------
// Row preparation
// ---------------------------------------------------------------------------

/// Turn one CSV row (header, value pairs) into a stored document.
///
/// The unlabeled column becomes `csv_id`, placeholder columns and empty values
/// are dropped, and every other column is stored under its long name. Returns
/// `None` when the row has no id value.
pub fn prepare_row<'r, I>(row: I) -> Option<BulkDocument>
where
    I: IntoIterator<Item = (&'r str, &'r str)>,
{
    let mut id = None;
    let mut source = Document::new();
    for (column, value) in row {
        if PLACEHOLDER_COLUMNS.contains(&column) || value.is_empty() {
            continue;
        }
        let field = if column == SOURCE_ID_COLUMN {
            id = Some(value.to_string());
            CSV_ID.to_string()
        } else {
            stored_field(column)
        };
        source.insert(field, Value::String(value.to_string()));
    }
    id.map(|id| BulkDocument { id, source })
}

// ---------------------------------------------------------------------------
// CSV reading
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum RawError {
    Csv(csv::Error),
    MissingIdColumn,
}

impl From<csv::Error> for RawError {
    fn from(e: csv::Error) -> Self {
        RawError::Csv(e)
    }
}

impl RawError {
    fn at(self, path: &Path) -> LoadError {
        let path = path.display().to_string();
        match self {
            RawError::Csv(source) => LoadError::Csv { path, source },
            RawError::MissingIdColumn => LoadError::MissingIdColumn { path },
        }
    }
}

fn read_season_stats_from_reader<R: Read>(rdr: R) -> Result<Vec<BulkDocument>, RawError> {
    let mut reader = csv::Reader::from_reader(rdr);
    let headers = reader.headers()?.clone();
    if !headers.iter().any(|h| h == SOURCE_ID_COLUMN) {
        return Err(RawError::MissingIdColumn);
    }

    let mut docs = Vec::new();
    for (line, result) in reader.records().enumerate() {
        let record = result?;
        match prepare_row(headers.iter().zip(record.iter())) {
            Some(doc) => docs.push(doc),
            None => warn!("Skipping season stats row {}: no id value", line + 1),
        }
    }
    Ok(docs)
}

/// Read every row of a season stats CSV.
///
/// Fails before returning anything if the unlabeled id column is absent.
pub fn read_season_stats(path: &Path) -> Result<Vec<BulkDocument>, LoadError> {
    let file = std::fs::File::open(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let docs = read_season_stats_from_reader(file).map_err(|e| e.at(path))?;
    info!("Read {} season stats rows from {}", docs.len(), path.display());
    Ok(docs)
}

/// Read the collection mapping document.
pub fn read_mapping(path: &Path) -> Result<Value, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&text).map_err(|e| LoadError::Mapping {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Replace `collection` with `docs`: drop it, recreate it with `mapping`, then
/// bulk write in chunks of `chunk_size`.
///
/// Stops at the first chunk the store partially rejects. Chunks written
/// before that stay written; running the load again replaces everything.
pub async fn load_season_stats<S>(
    store: &S,
    collection: &str,
    mapping: &Value,
    docs: &[BulkDocument],
    chunk_size: usize,
) -> Result<LoadSummary, LoadError>
where
    S: DocumentStore + ?Sized,
{
    let store_err = |action: &'static str| {
        move |source: StoreError| LoadError::Store {
            action,
            collection: collection.to_string(),
            source,
        }
    };

    store
        .delete_collection(collection)
        .await
        .map_err(store_err("delete"))?;
    store
        .create_collection(collection, mapping)
        .await
        .map_err(store_err("create"))?;
    debug!("Recreated collection {}", collection);

    let mut summary = LoadSummary::default();
    for (index, chunk) in docs.chunks(chunk_size.max(1)).enumerate() {
        let outcome = store
            .bulk_write(collection, chunk)
            .await
            .map_err(store_err("write to"))?;
        if let Some(first) = outcome.failures.first() {
            return Err(LoadError::ChunkFailed {
                chunk: index,
                rejected: outcome.failures.len(),
                first_reason: format!("{}: {}", first.id, first.reason),
            });
        }
        summary.chunks += 1;
        summary.written += outcome.written;
        info!("Chunk uploaded {}", chunk.len());
    }
    info!("Written: {}", summary.written);
    Ok(summary)
}

/// Read the CSV and mapping, then load them. Input problems surface before
/// the store is touched.
pub async fn load_season_stats_files<S>(
    store: &S,
    collection: &str,
    stats_csv: &Path,
    mapping: &Path,
    chunk_size: usize,
) -> Result<LoadSummary, LoadError>
where
    S: DocumentStore + ?Sized,
{
    let mapping = read_mapping(mapping)?;
    let docs = read_season_stats(stats_csv)?;
    load_season_stats(store, collection, &mapping, &docs, chunk_size).await
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    const CSV: &str = ",Year,Player,Pos,Age,Tm,blanl,TS%,blank2,2P%,Custom\n\
                       0,1950.0,Curly Armstrong,G-F,31.0,FTW,,0.368,,0.279,\n\
                       1,1950.0,Cliff Barker,SG,29.0,INO,,0.435,,,x\n\
                       2,1950.0,Leo Barnhorst,SF,25.0,CHS,,0.394,,0.310,\n";

    fn docs() -> Vec<BulkDocument> {
        read_season_stats_from_reader(CSV.as_bytes()).unwrap()
    }

    #[test]
    fn row_is_renamed_and_sparse() {
        let doc = prepare_row([
            ("", "7"),
            ("Player", "Bob Cousy"),
            ("Tm", "BOS"),
            ("blanl", ""),
            ("blank2", ""),
            ("3P%", ""),
            ("AST%", "31.2"),
        ])
        .unwrap();
        assert_eq!(doc.id, "7");
        assert_eq!(
            Value::Object(doc.source),
            json!({
                "csv_id": "7",
                "name": "Bob Cousy",
                "Team": "BOS",
                "Assist Percentage": "31.2"
            })
        );
    }

    #[test]
    fn row_without_id_value_is_skipped() {
        assert!(prepare_row([("", ""), ("Player", "Nobody")]).is_none());
    }

    #[test]
    fn unknown_columns_pass_through() {
        let docs = docs();
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[1].source["Custom"], json!("x"));
        assert!(!docs[1].source.contains_key("2-Point Field Goal Percentage"));
        assert!(!docs[0].source.contains_key("blanl"));
        assert_eq!(docs[2].source["Season"], json!("1950.0"));
        assert_eq!(docs[2].source["Position"], json!("SF"));
    }

    #[test]
    fn missing_id_column_is_fatal() {
        let csv = "Year,Player\n1950.0,Someone\n";
        let err = read_season_stats_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, RawError::MissingIdColumn));
    }

    #[tokio::test]
    async fn load_writes_every_chunk() {
        let store = MemoryStore::new();
        let mapping = json!({"mappings": {"properties": {}}});
        let summary = load_season_stats(&store, "season_stats", &mapping, &docs(), 2)
            .await
            .unwrap();
        assert_eq!(summary, LoadSummary { chunks: 2, written: 3 });
        assert_eq!(store.mapping("season_stats"), Some(mapping));
        let ids: Vec<String> = store
            .documents("season_stats")
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, ["0", "1", "2"]);
    }

    #[tokio::test]
    async fn loading_twice_gives_the_same_documents() {
        let store = MemoryStore::new();
        let mapping = json!({});
        load_season_stats(&store, "season_stats", &mapping, &docs(), 2000)
            .await
            .unwrap();
        let first = store.documents("season_stats").unwrap();
        load_season_stats(&store, "season_stats", &mapping, &docs(), 2000)
            .await
            .unwrap();
        assert_eq!(store.documents("season_stats").unwrap(), first);
    }

    #[tokio::test]
    async fn reload_drops_stale_documents() {
        let store = MemoryStore::new();
        store.seed(
            "season_stats",
            vec![("stale".to_string(), Document::new())],
        );
        load_season_stats(&store, "season_stats", &json!({}), &docs(), 2000)
            .await
            .unwrap();
        let docs = store.documents("season_stats").unwrap();
        assert!(docs.iter().all(|(id, _)| id != "stale"));
    }

    #[tokio::test]
    async fn rejected_chunk_aborts_the_load() {
        let store = MemoryStore::new();
        store.reject_ids(["2"]);
        let err = load_season_stats(&store, "season_stats", &json!({}), &docs(), 2)
            .await
            .unwrap_err();
        match err {
            LoadError::ChunkFailed {
                chunk,
                rejected,
                first_reason,
            } => {
                assert_eq!(chunk, 1);
                assert_eq!(rejected, 1);
                assert!(first_reason.starts_with("2:"));
            }
            other => panic!("expected ChunkFailed, got: {other}"),
        }
        // The first chunk stays written.
        assert_eq!(store.documents("season_stats").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_input_still_recreates_collection() {
        let store = MemoryStore::new();
        let summary = load_season_stats(&store, "season_stats", &json!({}), &[], 2000)
            .await
            .unwrap();
        assert_eq!(summary, LoadSummary::default());
        assert_eq!(store.documents("season_stats"), Some(Vec::new()));
    }

    #[tokio::test]
    async fn bad_mapping_fails_before_store_access() {
        let dir = std::env::temp_dir().join("hoopcards_loader_bad_mapping");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("mapping.json"), "{ not json").unwrap();
        std::fs::write(dir.join("stats.csv"), CSV).unwrap();

        let store = MemoryStore::new();
        let err = load_season_stats_files(
            &store,
            "season_stats",
            &dir.join("stats.csv"),
            &dir.join("mapping.json"),
            2000,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LoadError::Mapping { .. }));
        assert!(store.documents("season_stats").is_none());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
