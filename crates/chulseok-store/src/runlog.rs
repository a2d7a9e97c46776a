//! Append-only run history stored as JSON lines.
//!
//! Each run writes a "started" line and a "completed" line under the same
//! `run_id`; [`query`](JsonlRunLog::query) folds them back into one entry per
//! run. Lines are never rewritten.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use chulseok_core::collab::latest_runs;
use chulseok_core::{RunFilter, RunLog, RunLogEntry};
use tracing::{debug, warn};

use crate::LocalStoreError;

pub struct JsonlRunLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlRunLog {
    /// Open or create the log file, creating parent directories as needed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LocalStoreError> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), "opened run log");
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    fn read_all(&self) -> Result<Vec<RunLogEntry>, LocalStoreError> {
        let file = File::open(&self.path)?;
        let mut entries = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<RunLogEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    warn!(line = idx + 1, error = %err, "skipping malformed run log line");
                }
            }
        }
        Ok(entries)
    }
}

impl RunLog for JsonlRunLog {
    type Error = LocalStoreError;

    fn record(&self, entry: &RunLogEntry) -> Result<(), Self::Error> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| LocalStoreError::Io(std::io::Error::other("run log lock poisoned")))?;
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn query(&self, filter: &RunFilter) -> Result<Vec<RunLogEntry>, Self::Error> {
        Ok(latest_runs(self.read_all()?, filter))
    }
}
