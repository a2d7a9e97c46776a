//! One attendance run: posts in, cell writes out.
//!
//! ```text
//! fetch → deduplicate → classify → aggregate → validate
//!       → roster + sheet read → reconcile → batch write (retried)
//! ```
//!
//! Each stage consumes the whole output of the previous one. Nothing is
//! written unless validation passes, and every run, successful or not, is
//! recorded in the run log.

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::aggregate::{deduplicate, extract_weekly_submissions};
use crate::classify::filter_challenge_posts;
use crate::collab::{PostFetcher, RunLog, RunLogEntry, TabularStore};
use crate::error::{RunError, StoreError};
use crate::locate::{SheetSnapshot, range_origin};
use crate::model::{CellUpdate, Participant, RangeWrite, RunSummary};
use crate::reconcile::{ReconciliationWarning, reconcile};
use crate::retry::{RetryPolicy, Sleeper, retry_transient};
use crate::validate::inspect;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub board_id: String,
    pub pages: u32,
    /// A1 range holding the header row and participant rows. Its start cell
    /// offsets every written address.
    pub attendance_range: String,
    pub retry: RetryPolicy,
    /// Compute updates but skip the write.
    pub dry_run: bool,
}

/// What a run produced, including the partial picture of a failed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub success: bool,
    pub summary: RunSummary,
    pub error: Option<String>,
    pub updates: Vec<CellUpdate>,
    pub warnings: Vec<ReconciliationWarning>,
}

pub struct Pipeline<'a, L: RunLog> {
    fetcher: &'a dyn PostFetcher,
    store: &'a dyn TabularStore,
    sleeper: &'a dyn Sleeper,
    log: &'a L,
    config: PipelineConfig,
}

#[derive(Default)]
struct Progress {
    summary: RunSummary,
    updates: Vec<CellUpdate>,
    warnings: Vec<ReconciliationWarning>,
}

impl<'a, L: RunLog> Pipeline<'a, L> {
    pub fn new(
        fetcher: &'a dyn PostFetcher,
        store: &'a dyn TabularStore,
        sleeper: &'a dyn Sleeper,
        log: &'a L,
        config: PipelineConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            sleeper,
            log,
            config,
        }
    }

    /// Execute one full cycle and record it.
    pub async fn run(&self) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let started = RunLogEntry::started(run_id, Utc::now());
        self.record(&started);
        info!(%run_id, board = %self.config.board_id, dry_run = self.config.dry_run, "run started");

        let mut progress = Progress::default();
        let result = self.execute(&mut progress).await;

        let error = match &result {
            Ok(()) => {
                info!(
                    %run_id,
                    posts = progress.summary.total_posts,
                    weeks = progress.summary.weeks_processed,
                    cells = progress.summary.updated_cells,
                    "run completed"
                );
                None
            }
            Err(err) => {
                error!(%run_id, error = %err, "run failed");
                Some(err.to_string())
            }
        };

        let success = error.is_none();
        self.record(&RunLogEntry {
            completed_at: Some(Utc::now()),
            success,
            results: Some(progress.summary.clone()),
            error: error.clone(),
            ..started
        });

        RunOutcome {
            run_id,
            success,
            summary: progress.summary,
            error,
            updates: progress.updates,
            warnings: progress.warnings,
        }
    }

    async fn execute(&self, progress: &mut Progress) -> Result<(), RunError> {
        let range = &self.config.attendance_range;
        let origin = range_origin(range).ok_or_else(|| RunError::InvalidRange(range.clone()))?;

        let posts = self
            .fetcher
            .fetch_posts(&self.config.board_id, self.config.pages)
            .await?;
        progress.summary.total_posts = posts.len();
        for post in &posts {
            post.check()?;
        }

        let unique = deduplicate(posts);
        let challenge = filter_challenge_posts(unique.posts);
        let submissions = extract_weekly_submissions(&challenge);

        let report = inspect(&submissions);
        if !report.passed() {
            return Err(RunError::Validation(report.issues));
        }
        progress.summary.weeks_processed = submissions.week_count();

        let names = self.store.list_participants().await?;
        let roster: Vec<Participant> = names.iter().map(Participant::from_nickname).collect();
        progress.summary.participants = names;

        let rows = self.store.read_range(range).await?;
        let sheet = SheetSnapshot::with_origin(rows, origin);

        let reconciliation = reconcile(&submissions, &roster, &sheet);
        progress.updates = reconciliation.updates;
        progress.warnings = reconciliation.warnings;

        if self.config.dry_run {
            info!(updates = progress.updates.len(), "dry run, skipping write");
            return Ok(());
        }

        progress.summary.updated_cells = submit_updates(
            self.store,
            &progress.updates,
            &self.config.retry,
            self.sleeper,
        )
        .await?;
        Ok(())
    }

    fn record(&self, entry: &RunLogEntry) {
        if let Err(err) = self.log.record(entry) {
            warn!(run_id = %entry.run_id, error = %err, "failed to record run log entry");
        }
    }
}

/// Send all updates as a single batch, retrying transient failures.
///
/// An empty batch is not sent.
pub async fn submit_updates(
    store: &dyn TabularStore,
    updates: &[CellUpdate],
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<u64, StoreError> {
    if updates.is_empty() {
        info!("no attendance updates to write");
        return Ok(0);
    }
    let writes: Vec<RangeWrite> = updates.iter().map(RangeWrite::from).collect();
    let updated = retry_transient(policy, sleeper, "batch_write", || store.batch_write(&writes)).await?;
    info!(requested = writes.len(), updated, "attendance batch written");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::collab::{MemoryRunLog, RunFilter};
    use crate::error::FetchError;
    use crate::model::RawPost;
    use crate::retry::testing::RecordingSleeper;

    struct StaticFetcher(Result<Vec<RawPost>, String>);

    #[async_trait]
    impl PostFetcher for StaticFetcher {
        async fn fetch_posts(&self, _board: &str, _pages: u32) -> Result<Vec<RawPost>, FetchError> {
            self.0.clone().map_err(FetchError)
        }
    }

    /// Sheet held in memory; batch writes fail with the scripted errors first.
    struct MemoryStore {
        participants: Vec<String>,
        rows: Mutex<Vec<Vec<String>>>,
        failures: Mutex<VecDeque<StoreError>>,
        write_calls: Mutex<usize>,
    }

    impl MemoryStore {
        fn new(participants: &[&str], rows: &[&[&str]]) -> Self {
            Self {
                participants: participants.iter().map(|s| s.to_string()).collect(),
                rows: Mutex::new(
                    rows.iter()
                        .map(|r| r.iter().map(|c| c.to_string()).collect())
                        .collect(),
                ),
                failures: Mutex::new(VecDeque::new()),
                write_calls: Mutex::new(0),
            }
        }

        fn failing_with(self, errors: Vec<StoreError>) -> Self {
            *self.failures.lock().unwrap() = errors.into();
            self
        }

        fn cell(&self, address: &str) -> String {
            let col = (address.as_bytes()[0] - b'A') as usize;
            let row: usize = address[1..].parse::<usize>().unwrap() - 1;
            self.rows.lock().unwrap()[row]
                .get(col)
                .cloned()
                .unwrap_or_default()
        }
    }

    #[async_trait]
    impl TabularStore for MemoryStore {
        async fn read_range(&self, _range: &str) -> Result<Vec<Vec<String>>, StoreError> {
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn batch_write(&self, writes: &[RangeWrite]) -> Result<u64, StoreError> {
            *self.write_calls.lock().unwrap() += 1;
            if let Some(err) = self.failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            let mut rows = self.rows.lock().unwrap();
            for write in writes {
                let col = (write.range.as_bytes()[0] - b'A') as usize;
                let row: usize = write.range[1..].parse::<usize>().unwrap() - 1;
                let line = &mut rows[row];
                if line.len() <= col {
                    line.resize(col + 1, String::new());
                }
                line[col] = write.values[0][0].clone();
            }
            Ok(writes.len() as u64)
        }

        async fn list_participants(&self) -> Result<Vec<String>, StoreError> {
            Ok(self.participants.clone())
        }
    }

    fn post(id: &str, title: &str, author: &str) -> RawPost {
        RawPost::new(id, title, author, "", "2026-03-02T09:00:00Z".parse().unwrap()).unwrap()
    }

    fn config(dry_run: bool) -> PipelineConfig {
        PipelineConfig {
            board_id: "challenge".into(),
            pages: 3,
            attendance_range: "출석부!A1:D10".into(),
            retry: RetryPolicy::default(),
            dry_run,
        }
    }

    fn sheet_store() -> MemoryStore {
        MemoryStore::new(
            &["김상현", "이영희"],
            &[
                &["이름", "1주차", "2주차"],
                &["김상현", "", ""],
                &["이영희", "", ""],
            ],
        )
    }

    #[tokio::test]
    async fn end_to_end_marks_single_cell() {
        let fetcher = StaticFetcher(Ok(vec![post("1", "1주차 인증 김상현", "김상현")]));
        let store = sheet_store();
        let sleeper = RecordingSleeper::default();
        let log = MemoryRunLog::new();

        let outcome = Pipeline::new(&fetcher, &store, &sleeper, &log, config(false))
            .run()
            .await;

        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(outcome.updates, vec![CellUpdate::present("B2")]);
        assert_eq!(outcome.summary.total_posts, 1);
        assert_eq!(outcome.summary.weeks_processed, 1);
        assert_eq!(outcome.summary.updated_cells, 1);
        assert_eq!(outcome.summary.participants, vec!["김상현", "이영희"]);
        assert_eq!(store.cell("B2"), "O");
        assert_eq!(store.cell("C2"), "");
    }

    #[tokio::test]
    async fn duplicates_and_noise_are_filtered_before_write() {
        let fetcher = StaticFetcher(Ok(vec![
            post("1", "1주차 인증", "김상현(반장)"),
            post("1", "1주차 인증", "김상현(반장)"),
            post("2", "2주차", "이영희"),
            post("3", "가입인사", "박철수"),
            post("4", "2주차 인증", "외부인"),
        ]));
        let store = sheet_store();
        let sleeper = RecordingSleeper::default();
        let log = MemoryRunLog::new();

        let outcome = Pipeline::new(&fetcher, &store, &sleeper, &log, config(false))
            .run()
            .await;

        assert!(outcome.success);
        assert_eq!(
            outcome.updates,
            vec![CellUpdate::present("B2"), CellUpdate::present("C3")]
        );
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].identity, "외부인");
        assert_eq!(*store.write_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn validation_failure_writes_nothing() {
        let fetcher = StaticFetcher(Ok(vec![post("1", "공지사항", "운영자")]));
        let store = sheet_store();
        let sleeper = RecordingSleeper::default();
        let log = MemoryRunLog::new();

        let outcome = Pipeline::new(&fetcher, &store, &sleeper, &log, config(false))
            .run()
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("validation failed"));
        assert_eq!(*store.write_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn fetch_failure_is_fatal_and_logged() {
        let fetcher = StaticFetcher(Err("login required".into()));
        let store = sheet_store();
        let sleeper = RecordingSleeper::default();
        let log = MemoryRunLog::new();

        let outcome = Pipeline::new(&fetcher, &store, &sleeper, &log, config(false))
            .run()
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap().contains("login required"));

        let runs = log.query(&RunFilter::default()).unwrap();
        assert_eq!(runs.len(), 1);
        assert!(runs[0].is_complete());
        assert!(!runs[0].success);
        assert_eq!(log.entries().len(), 2);
    }

    #[tokio::test]
    async fn transient_write_failures_are_retried_once_applied() {
        let fetcher = StaticFetcher(Ok(vec![post("1", "1주차", "김상현")]));
        let store = sheet_store().failing_with(vec![
            StoreError::Transient("429".into()),
            StoreError::Transient("503".into()),
        ]);
        let sleeper = RecordingSleeper::default();
        let log = MemoryRunLog::new();

        let outcome = Pipeline::new(&fetcher, &store, &sleeper, &log, config(false))
            .run()
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.summary.updated_cells, 1);
        assert_eq!(*store.write_calls.lock().unwrap(), 3);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 2);
        assert_eq!(store.cell("B2"), "O");
    }

    #[tokio::test]
    async fn fatal_write_failure_fails_the_run() {
        let fetcher = StaticFetcher(Ok(vec![post("1", "1주차", "김상현")]));
        let store = sheet_store().failing_with(vec![StoreError::Fatal("permission denied".into())]);
        let sleeper = RecordingSleeper::default();
        let log = MemoryRunLog::new();

        let outcome = Pipeline::new(&fetcher, &store, &sleeper, &log, config(false))
            .run()
            .await;

        assert!(!outcome.success);
        assert_eq!(*store.write_calls.lock().unwrap(), 1);
        assert_eq!(store.cell("B2"), "");
        let runs = log.query(&RunFilter::default()).unwrap();
        assert!(runs[0].error.as_deref().unwrap().contains("permission denied"));
    }

    #[tokio::test]
    async fn dry_run_computes_updates_without_writing() {
        let fetcher = StaticFetcher(Ok(vec![post("1", "2주차", "이영희")]));
        let store = sheet_store();
        let sleeper = RecordingSleeper::default();
        let log = MemoryRunLog::new();

        let outcome = Pipeline::new(&fetcher, &store, &sleeper, &log, config(true))
            .run()
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.updates, vec![CellUpdate::present("C3")]);
        assert_eq!(outcome.summary.updated_cells, 0);
        assert_eq!(*store.write_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn offset_attendance_range_writes_absolute_addresses() {
        let fetcher = StaticFetcher(Ok(vec![post("1", "1주차", "김상현")]));
        let store = MemoryStore::new(&["김상현"], &[&["이름", "1주차"], &["김상현", ""]]);
        let sleeper = RecordingSleeper::default();
        let log = MemoryRunLog::new();
        let config = PipelineConfig {
            attendance_range: "출석부!B3:Z20".into(),
            ..config(true)
        };

        let outcome = Pipeline::new(&fetcher, &store, &sleeper, &log, config)
            .run()
            .await;

        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(outcome.updates, vec![CellUpdate::present("C4")]);
    }

    #[tokio::test]
    async fn named_attendance_range_is_rejected_before_fetch() {
        let fetcher = StaticFetcher(Ok(vec![post("1", "1주차", "김상현")]));
        let store = sheet_store();
        let sleeper = RecordingSleeper::default();
        let log = MemoryRunLog::new();
        let config = PipelineConfig {
            attendance_range: "Attendance".into(),
            ..config(false)
        };

        let outcome = Pipeline::new(&fetcher, &store, &sleeper, &log, config)
            .run()
            .await;

        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("A1 notation"));
        assert_eq!(outcome.summary.total_posts, 0);
        assert_eq!(*store.write_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_batch_is_not_sent() {
        let store = sheet_store();
        let sleeper = RecordingSleeper::default();
        let updated = submit_updates(&store, &[], &RetryPolicy::default(), &sleeper)
            .await
            .unwrap();
        assert_eq!(updated, 0);
        assert_eq!(*store.write_calls.lock().unwrap(), 0);
    }
}
