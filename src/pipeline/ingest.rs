//! Line ingestion: read a text source to EOF into trimmed, immutable lines.
//!
//! Blank lines are kept as empty strings. The segmenter relies on them to
//! end windows early, so dropping them would change the deck.

use crate::error::DeckError;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One trimmed source line and its 0-based position in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub number: usize,
    pub text: String,
}

impl Line {
    pub fn is_blank(&self) -> bool {
        self.text.is_empty()
    }
}

/// Read every line of `path`.
///
/// Runs on the blocking pool: ingestion must finish before segmentation
/// starts, and a large file should not stall a runtime worker meanwhile.
pub async fn ingest_file(path: &Path) -> Result<Vec<Line>, DeckError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || ingest_file_blocking(&path))
        .await
        .map_err(|e| DeckError::Internal(format!("Ingest task panicked: {}", e)))?
}

/// Blocking implementation of [`ingest_file`].
pub fn ingest_file_blocking(path: &Path) -> Result<Vec<Line>, DeckError> {
    let file = std::fs::File::open(path).map_err(|e| open_error(path.to_path_buf(), e))?;
    let lines = ingest_reader(BufReader::new(file)).map_err(|e| DeckError::SourceReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!("Ingested {} lines from {}", lines.len(), path.display());
    Ok(lines)
}

/// Read `reader` to EOF, trimming each line.
pub fn ingest_reader<R: BufRead>(reader: R) -> std::io::Result<Vec<Line>> {
    reader
        .lines()
        .enumerate()
        .map(|(number, line)| {
            line.map(|text| Line {
                number,
                text: text.trim().to_string(),
            })
        })
        .collect()
}

/// Build lines from in-memory text, for callers that already hold it.
pub fn lines_from_str(text: &str) -> Vec<Line> {
    text.lines()
        .enumerate()
        .map(|(number, text)| Line {
            number,
            text: text.trim().to_string(),
        })
        .collect()
}

fn open_error(path: PathBuf, e: std::io::Error) -> DeckError {
    match e.kind() {
        std::io::ErrorKind::NotFound => DeckError::SourceNotFound { path },
        std::io::ErrorKind::PermissionDenied => DeckError::PermissionDenied { path },
        _ => DeckError::SourceReadFailed { path, source: e },
    }
}
