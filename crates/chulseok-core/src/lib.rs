//! Weekly challenge attendance: post parsing, submission aggregation,
//! validation, and reconciliation against the attendance sheet.

pub mod aggregate;
pub mod classify;
pub mod collab;
pub mod error;
pub mod locate;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod retry;
pub mod validate;

pub use aggregate::{Deduplicated, deduplicate, extract_weekly_submissions};
pub use classify::{filter_challenge_posts, filter_recent, is_challenge_post};
pub use collab::{MemoryRunLog, PostFetcher, RunFilter, RunLog, RunLogEntry, TabularStore};
pub use error::{FetchError, ParsingError, RunError, StoreError};
pub use locate::{SheetSnapshot, locate, range_origin};
pub use model::{CellUpdate, Participant, RangeWrite, RawPost, RunSummary, WeekNumber, WeeklySubmissions};
pub use normalize::{extract_week_number, normalize_identity, parse_week_and_identity};
pub use pipeline::{Pipeline, PipelineConfig, RunOutcome, submit_updates};
pub use reconcile::{Reconciliation, ReconciliationWarning, reconcile};
pub use report::AttendanceReport;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use validate::{ValidationIssue, ValidationReport, validate};
