//! Command records read from the input CSV

use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::CheckError;

const ID_COLUMN: &str = "id";
const SCRIPT_COLUMN: &str = "result";

/// One command to run, as read from the input file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CommandRecord {
    /// Opaque identifier, only used for logging
    pub id: String,
    /// Script text as stored, with literal `\n` escapes
    #[serde(rename = "result")]
    pub script: String,
}

impl CommandRecord {
    /// Create a new command record
    pub fn new(id: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            script: script.into(),
        }
    }

    /// Script with literal `\n` sequences turned into newlines
    #[must_use]
    pub fn command(&self) -> String {
        self.script.replace("\\n", "\n")
    }
}

/// Load every record from a CSV file, in file order
///
/// # Errors
/// Returns `CheckError::Input` if the file cannot be read or a row is
/// malformed, and `CheckError::MissingColumn` if the header lacks `id` or
/// `result`
pub fn load(path: &Path) -> Result<Vec<CommandRecord>, CheckError> {
    let reader = csv::Reader::from_path(path).map_err(|source| CheckError::Input {
        path: path.to_path_buf(),
        source,
    })?;

    let records = read_records(reader, path)?;
    debug!(path = %path.display(), count = records.len(), "loaded command records");

    Ok(records)
}

fn read_records<R: Read>(
    mut reader: csv::Reader<R>,
    path: &Path,
) -> Result<Vec<CommandRecord>, CheckError> {
    let headers = reader.headers().map_err(|source| CheckError::Input {
        path: path.to_path_buf(),
        source,
    })?;

    for column in [ID_COLUMN, SCRIPT_COLUMN] {
        if !headers.iter().any(|h| h == column) {
            return Err(CheckError::MissingColumn {
                path: path.to_path_buf(),
                column,
            });
        }
    }

    reader
        .deserialize()
        .map(|row| {
            row.map_err(|source| CheckError::Input {
                path: path.to_path_buf(),
                source,
            })
        })
        .collect()
}
