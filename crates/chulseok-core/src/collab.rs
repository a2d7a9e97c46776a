//! Interfaces to the external collaborators: post source, tabular store,
//! and run log.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FetchError, StoreError};
use crate::model::{RangeWrite, RawPost, RunSummary};

/// Delivers the raw posts of a board.
#[async_trait]
pub trait PostFetcher: Send + Sync {
    /// All posts from the first `pages` pages of `board_id`. A failure
    /// means no posts at all; partial lists are never returned.
    async fn fetch_posts(&self, board_id: &str, pages: u32) -> Result<Vec<RawPost>, FetchError>;
}

/// Spreadsheet-like store holding the attendance grid.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Values of `range`, row-major, already decoded.
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>, StoreError>;

    /// Apply every write as one request; returns the number of cells updated.
    async fn batch_write(&self, writes: &[RangeWrite]) -> Result<u64, StoreError>;

    /// Participant identities from the roster column.
    async fn list_participants(&self) -> Result<Vec<String>, StoreError>;
}

/// One line of the run history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLogEntry {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub success: bool,
    pub results: Option<RunSummary>,
    pub error: Option<String>,
}

impl RunLogEntry {
    /// Entry for a run that has just begun.
    pub fn started(run_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            completed_at: None,
            success: false,
            results: None,
            error: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Selection over recorded runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFilter {
    pub success: Option<bool>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl RunFilter {
    pub fn matches(&self, entry: &RunLogEntry) -> bool {
        if let Some(success) = self.success
            && entry.success != success
        {
            return false;
        }
        if let Some(since) = self.since
            && entry.started_at < since
        {
            return false;
        }
        true
    }
}

/// Append-only record of runs.
pub trait RunLog: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn record(&self, entry: &RunLogEntry) -> Result<(), Self::Error>;

    /// Latest state of each matching run, newest first.
    fn query(&self, filter: &RunFilter) -> Result<Vec<RunLogEntry>, Self::Error>;
}

/// Fold an append-only history into the latest entry per run, newest
/// first, then apply `filter`.
pub fn latest_runs(
    entries: impl IntoIterator<Item = RunLogEntry>,
    filter: &RunFilter,
) -> Vec<RunLogEntry> {
    let mut latest: HashMap<Uuid, RunLogEntry> = HashMap::new();
    for entry in entries {
        latest.insert(entry.run_id, entry);
    }
    let mut runs: Vec<RunLogEntry> = latest.into_values().filter(|e| filter.matches(e)).collect();
    runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
    if let Some(limit) = filter.limit {
        runs.truncate(limit);
    }
    runs
}

/// Run log kept in memory for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryRunLog {
    entries: Mutex<Vec<RunLogEntry>>,
}

impl MemoryRunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded line, in append order.
    pub fn entries(&self) -> Vec<RunLogEntry> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

impl RunLog for MemoryRunLog {
    type Error = Infallible;

    fn record(&self, entry: &RunLogEntry) -> Result<(), Self::Error> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
        Ok(())
    }

    fn query(&self, filter: &RunFilter) -> Result<Vec<RunLogEntry>, Self::Error> {
        Ok(latest_runs(self.entries(), filter))
    }
}
