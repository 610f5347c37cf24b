// Draft list input and player card output (CSV).
//
// The draft list names the players (and optionally the seasons) to build
// cards for. A blank year means every season on record for that player.

use std::io::{Read, Write};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::model::PlayerCard;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One requested player, optionally pinned to a season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftEntry {
    pub name: String,
    pub year: Option<String>,
}

impl DraftEntry {
    pub fn new(name: impl Into<String>, year: Option<&str>) -> Self {
        Self {
            name: name.into(),
            year: year.map(str::to_string),
        }
    }
}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path} has no `{column}` column")]
    MissingColumn { path: String, column: &'static str },
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawDraftRow {
    name: String,
    #[serde(default)]
    year: Option<String>,
}

// ---------------------------------------------------------------------------
// Reader/writer-based functions
// ---------------------------------------------------------------------------

/// Errors from the reader-based functions, before a path is attached.
#[derive(Debug)]
enum RawError {
    Csv(csv::Error),
    MissingColumn(&'static str),
}

impl From<csv::Error> for RawError {
    fn from(e: csv::Error) -> Self {
        RawError::Csv(e)
    }
}

impl RawError {
    fn at(self, path: &Path) -> DraftError {
        let path = path.display().to_string();
        match self {
            RawError::Csv(source) => DraftError::Csv { path, source },
            RawError::MissingColumn(column) => DraftError::MissingColumn { path, column },
        }
    }
}

fn read_draft_from_reader<R: Read>(rdr: R) -> Result<Vec<DraftEntry>, RawError> {
    // Rows may stop after the name when the year is left out.
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(rdr);
    if !reader.headers()?.iter().any(|h| h == "name") {
        return Err(RawError::MissingColumn("name"));
    }

    let mut entries = Vec::new();
    for result in reader.deserialize::<RawDraftRow>() {
        let raw = result?;
        let year = raw.year.filter(|y| !y.is_empty());
        entries.push(DraftEntry {
            name: raw.name,
            year,
        });
    }
    Ok(entries)
}

fn write_cards_to_writer<W: Write>(wtr: W, cards: &[PlayerCard]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    if cards.is_empty() {
        writer.write_record(CARD_HEADER)?;
    }
    for card in cards {
        writer.serialize(card)?;
    }
    writer.flush()?;
    Ok(())
}

fn read_cards_from_reader<R: Read>(rdr: R) -> Result<Vec<PlayerCard>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    reader.deserialize().collect()
}

/// Cards CSV header, in column order.
pub const CARD_HEADER: [&str; 12] = [
    "Name", "Year", "Team", "Position", "2PT", "3PT", "DRB", "ORB", "AST", "BLK", "STL", "SKL",
];

// ---------------------------------------------------------------------------
// Public path-based functions
// ---------------------------------------------------------------------------

/// Read the draft list, preserving row order.
///
/// Fails before returning anything if the `name` column is absent.
pub fn read_draft(path: &Path) -> Result<Vec<DraftEntry>, DraftError> {
    let file = std::fs::File::open(path).map_err(|e| DraftError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    read_draft_from_reader(file).map_err(|e| e.at(path))
}

/// Write cards to `path`, replacing any existing file.
pub fn write_cards(path: &Path, cards: &[PlayerCard]) -> Result<(), DraftError> {
    let file = std::fs::File::create(path).map_err(|e| DraftError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    write_cards_to_writer(file, cards).map_err(|e| DraftError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Read a cards CSV previously produced by [`write_cards`].
pub fn read_cards(path: &Path) -> Result<Vec<PlayerCard>, DraftError> {
    let file = std::fs::File::open(path).map_err(|e| DraftError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    read_cards_from_reader(file).map_err(|e| DraftError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
