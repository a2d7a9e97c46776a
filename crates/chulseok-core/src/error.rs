use thiserror::Error;

use crate::validate::ValidationIssue;

/// A record that cannot be put through the pipeline at all.
#[derive(Debug, Error)]
pub enum ParsingError {
    #[error("post {title:?} has an empty identifier")]
    EmptyIdentifier { title: String },
}

/// Failure reported by the tabular store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Rate limiting or a server-side failure; worth retrying.
    #[error("transient store error: {0}")]
    Transient(String),

    #[error("store error: {0}")]
    Fatal(String),

    #[error("store still failing after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// The page-content fetcher could not deliver a complete post list.
#[derive(Debug, Error)]
#[error("post fetch failed: {0}")]
pub struct FetchError(pub String);

/// Why a run stopped before (or while) writing to the store.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("attendance range {0:?} does not name a start cell in A1 notation")]
    InvalidRange(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parsing(#[from] ParsingError),

    #[error("validation failed: {}", summarize(.0))]
    Validation(Vec<ValidationIssue>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
