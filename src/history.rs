use std::error::Error;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

/// One executed command line. Ids are strictly increasing per store;
/// records are never mutated or deleted by the shell.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: u64,
    pub ts: DateTime<Utc>,
    pub cmd: String,
}

#[derive(Debug)]
pub enum HistoryError {
    Io(io::Error),
    Encode(serde_json::Error),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::Io(e) => write!(f, "{}", e),
            HistoryError::Encode(e) => write!(f, "{}", e),
        }
    }
}

impl Error for HistoryError {}

impl From<io::Error> for HistoryError {
    fn from(e: io::Error) -> Self {
        HistoryError::Io(e)
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(e: serde_json::Error) -> Self {
        HistoryError::Encode(e)
    }
}

/// Append-only history persistence, one JSON record per line.
///
/// The handle is owned by the shell loop for its whole lifetime; all access
/// happens from the single control thread. `append` and `recent` are
/// independent round trips against the file, no state is cached between
/// them beyond the next id.
pub struct HistoryStore {
    path: PathBuf,
    file: File,
    next_id: u64,
}

impl HistoryStore {
    /// Opens (or creates) the store at `path` and resumes the monotonic id
    /// from the highest record already present.
    pub fn open(path: &Path) -> Result<HistoryStore, HistoryError> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let max_id = read_records(path)?
            .iter()
            .map(|rec| rec.id)
            .max()
            .unwrap_or(0);

        Ok(HistoryStore {
            path: path.to_path_buf(),
            file,
            next_id: max_id + 1,
        })
    }

    /// Appends one record for `cmd`, stamped now. Exactly one record per
    /// call; the line is flushed before returning.
    pub fn append(&mut self, cmd: &str) -> Result<HistoryRecord, HistoryError> {
        let record = HistoryRecord {
            id: self.next_id,
            ts: Utc::now(),
            cmd: cmd.to_string(),
        };

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;

        self.next_id += 1;
        Ok(record)
    }

    /// Returns up to `limit` records, most recent first.
    pub fn recent(&self, limit: usize) -> Result<Vec<HistoryRecord>, HistoryError> {
        let mut records = read_records(&self.path)?;
        records.reverse();
        records.truncate(limit);
        Ok(records)
    }
}

fn read_records(path: &Path) -> Result<Vec<HistoryRecord>, HistoryError> {
    let reader = BufReader::new(File::open(path)?);
    let mut records = Vec::new();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<HistoryRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!("skipping malformed history line: {}", e),
        }
    }

    Ok(records)
}
