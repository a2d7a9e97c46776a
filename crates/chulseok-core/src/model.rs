//! Shared record types passed between the pipeline stages and the
//! external collaborators.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ParsingError;

/// Week number as written in post titles ("3주차" → 3).
///
/// Extraction accepts any number; the domain range is enforced by
/// [`validate`](crate::validate::validate).
pub type WeekNumber = u32;

/// Lowest week accepted by the validation gate.
pub const MIN_WEEK: WeekNumber = 1;
/// Highest week accepted by the validation gate.
pub const MAX_WEEK: WeekNumber = 52;

/// Value written into an attendance cell.
pub const PRESENT_MARK: &str = "O";
/// Value shown for a participant who did not submit (never written).
pub const ABSENT_MARK: &str = "X";

/// A board post as handed over by the page-content fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPost {
    pub identifier: String,
    pub title: String,
    #[serde(alias = "author")]
    pub author_identity: String,
    #[serde(default, alias = "content")]
    pub body: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub source_url: Option<String>,
}

impl RawPost {
    /// Build a post, rejecting a blank identifier.
    pub fn new(
        identifier: impl Into<String>,
        title: impl Into<String>,
        author_identity: impl Into<String>,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ParsingError> {
        let post = Self {
            identifier: identifier.into(),
            title: title.into(),
            author_identity: author_identity.into(),
            body: body.into(),
            created_at,
            source_url: None,
        };
        post.check()?;
        Ok(post)
    }

    /// Structural check applied to every post entering the pipeline.
    pub fn check(&self) -> Result<(), ParsingError> {
        if self.identifier.trim().is_empty() {
            return Err(ParsingError::EmptyIdentifier {
                title: self.title.clone(),
            });
        }
        Ok(())
    }
}

/// A roster entry. Submissions are matched against `nickname`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub nickname: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Participant {
    /// Roster entry for a sheet that only carries nicknames.
    pub fn from_nickname(nickname: impl Into<String>) -> Self {
        let nickname = nickname.into();
        Self {
            name: nickname.clone(),
            nickname,
            email: None,
            active: true,
        }
    }
}

/// Week → set of normalized identities.
///
/// Insertion refuses blank identities; duplicates collapse. Week numbers
/// are stored as extracted, so out-of-range values reach the validation
/// gate instead of being silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeeklySubmissions {
    weeks: BTreeMap<WeekNumber, BTreeSet<String>>,
}

impl WeeklySubmissions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `identity` as a submitter for `week`.
    ///
    /// Returns `false` when the identity is blank or was already present.
    pub fn insert(&mut self, week: WeekNumber, identity: impl Into<String>) -> bool {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return false;
        }
        self.weeks.entry(week).or_default().insert(identity)
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }

    /// Number of distinct weeks.
    pub fn week_count(&self) -> usize {
        self.weeks.len()
    }

    /// Total (week, identity) pairs.
    pub fn submission_count(&self) -> usize {
        self.weeks.values().map(BTreeSet::len).sum()
    }

    pub fn weeks(&self) -> impl Iterator<Item = WeekNumber> + '_ {
        self.weeks.keys().copied()
    }

    pub fn submitters(&self, week: WeekNumber) -> Option<&BTreeSet<String>> {
        self.weeks.get(&week)
    }

    pub fn contains(&self, week: WeekNumber, identity: &str) -> bool {
        self.weeks
            .get(&week)
            .is_some_and(|set| set.contains(identity))
    }

    /// Iterate weeks in ascending order with their submitters.
    pub fn iter(&self) -> impl Iterator<Item = (WeekNumber, &BTreeSet<String>)> {
        self.weeks.iter().map(|(week, set)| (*week, set))
    }

    /// Every (week, identity) pair, weeks ascending then identities sorted.
    pub fn pairs(&self) -> impl Iterator<Item = (WeekNumber, &str)> {
        self.weeks
            .iter()
            .flat_map(|(week, set)| set.iter().map(move |id| (*week, id.as_str())))
    }
}

impl<S: Into<String>> FromIterator<(WeekNumber, S)> for WeeklySubmissions {
    fn from_iter<I: IntoIterator<Item = (WeekNumber, S)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (week, identity) in iter {
            out.insert(week, identity);
        }
        out
    }
}

/// One cell write. `value` is always [`PRESENT_MARK`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellUpdate {
    pub address: String,
    pub value: String,
}

impl CellUpdate {
    /// The only constructor: attendance marks are positive-only.
    pub fn present(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            value: PRESENT_MARK.to_string(),
        }
    }
}

/// A rectangular write handed to the tabular store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeWrite {
    pub range: String,
    pub values: Vec<Vec<String>>,
}

impl From<&CellUpdate> for RangeWrite {
    fn from(update: &CellUpdate) -> Self {
        Self {
            range: update.address.clone(),
            values: vec![vec![update.value.clone()]],
        }
    }
}

/// Results of one run, as consumed by the run log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_posts: usize,
    pub weeks_processed: usize,
    pub updated_cells: u64,
    pub participants: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> DateTime<Utc> {
        "2026-03-02T09:00:00Z".parse().unwrap()
    }

    #[test]
    fn raw_post_rejects_blank_identifier() {
        let err = RawPost::new("  ", "1주차 인증", "김상현", "", at()).unwrap_err();
        assert!(matches!(err, ParsingError::EmptyIdentifier { .. }));
    }

    #[test]
    fn raw_post_accepts_crawler_field_names() {
        let json = r#"{
            "identifier": "1001",
            "title": "3주차 인증",
            "author": "김상현(반장)",
            "content": "오늘도 완료",
            "created_at": "2026-03-02T09:00:00Z"
        }"#;
        let post: RawPost = serde_json::from_str(json).unwrap();
        assert_eq!(post.author_identity, "김상현(반장)");
        assert_eq!(post.body, "오늘도 완료");
        assert!(post.source_url.is_none());
    }

    #[test]
    fn submissions_collapse_duplicates_and_skip_blank() {
        let mut subs = WeeklySubmissions::new();
        assert!(subs.insert(1, "김상현"));
        assert!(!subs.insert(1, "김상현"));
        assert!(!subs.insert(1, "   "));
        assert!(subs.insert(2, "이영희"));
        assert_eq!(subs.week_count(), 2);
        assert_eq!(subs.submission_count(), 2);
        assert!(subs.contains(1, "김상현"));
        assert!(!subs.contains(2, "김상현"));
    }

    #[test]
    fn pairs_are_ordered_by_week_then_identity() {
        let subs: WeeklySubmissions = [(2, "나"), (1, "다"), (1, "가")].into_iter().collect();
        let pairs: Vec<_> = subs.pairs().collect();
        assert_eq!(pairs, vec![(1, "가"), (1, "다"), (2, "나")]);
    }

    #[test]
    fn participant_defaults_to_active() {
        let p: Participant =
            serde_json::from_str(r#"{"name": "김상현", "nickname": "sanghyun"}"#).unwrap();
        assert!(p.active);
        assert!(p.email.is_none());
    }

    #[test]
    fn cell_update_converts_to_single_cell_write() {
        let write = RangeWrite::from(&CellUpdate::present("B2"));
        assert_eq!(write.range, "B2");
        assert_eq!(write.values, vec![vec!["O".to_string()]]);
    }
}
