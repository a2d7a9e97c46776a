//! Folding posts into week → submitters.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::model::{RawPost, WeekNumber, WeeklySubmissions};
use crate::normalize::{extract_week_number, normalize_identity};

/// Posts left after dropping repeated identifiers.
#[derive(Debug, Clone)]
pub struct Deduplicated {
    pub posts: Vec<RawPost>,
    pub removed: usize,
}

/// Drop posts whose identifier was already seen, keeping the first occurrence.
pub fn deduplicate(posts: Vec<RawPost>) -> Deduplicated {
    let total = posts.len();
    let mut seen: HashSet<String> = HashSet::with_capacity(total);
    let posts: Vec<RawPost> = posts
        .into_iter()
        .filter(|p| seen.insert(p.identifier.clone()))
        .collect();
    let removed = total - posts.len();
    info!(total, removed, "deduplicated posts");
    Deduplicated { posts, removed }
}

/// Week a post belongs to: the title's number, else the body's.
pub fn week_of_post(post: &RawPost) -> Option<WeekNumber> {
    extract_week_number(&post.title).or_else(|| extract_week_number(&post.body))
}

/// Build the submissions map. Posts without a week or with an author that
/// normalizes to nothing contribute nothing.
pub fn extract_weekly_submissions(posts: &[RawPost]) -> WeeklySubmissions {
    let mut submissions = WeeklySubmissions::new();

    for post in posts {
        let Some(week) = week_of_post(post) else {
            continue;
        };
        let author = normalize_identity(&post.author_identity);
        if author.is_empty() {
            debug!(post = %post.identifier, "author normalized to empty, skipped");
            continue;
        }
        debug!(author = %author, week, "submission recorded");
        submissions.insert(week, author);
    }

    info!(
        weeks = submissions.week_count(),
        submissions = submissions.submission_count(),
        "extracted weekly submissions"
    );
    submissions
}
