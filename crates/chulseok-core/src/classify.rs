//! Challenge-post detection.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::info;

use crate::model::RawPost;
use crate::normalize::extract_week_number;

/// Keywords that mark a post as challenge-related even without a week
/// number: challenge, mission, assignment, verification.
pub const CHALLENGE_KEYWORDS: &[&str] = &["챌린지", "미션", "과제", "인증"];

/// Default window for [`filter_recent`].
pub const DEFAULT_RECENT_DAYS: i64 = 7;

/// True when the title or body carries a week number or a challenge keyword.
pub fn is_challenge_post(post: &RawPost) -> bool {
    if extract_week_number(&post.title).is_some() || extract_week_number(&post.body).is_some() {
        return true;
    }
    let combined = format!("{} {}", post.title, post.body).to_lowercase();
    CHALLENGE_KEYWORDS.iter().any(|kw| combined.contains(kw))
}

/// Keep only challenge posts, preserving input order.
pub fn filter_challenge_posts(posts: Vec<RawPost>) -> Vec<RawPost> {
    let total = posts.len();
    let kept: Vec<RawPost> = posts.into_iter().filter(is_challenge_post).collect();
    info!(total, kept = kept.len(), "filtered challenge posts");
    kept
}

/// Keep posts created within `days` of `now`.
///
/// A window reaching past the earliest representable time keeps everything.
pub fn filter_recent(posts: Vec<RawPost>, now: DateTime<Utc>, days: i64) -> Vec<RawPost> {
    let threshold = TimeDelta::try_days(days).and_then(|window| now.checked_sub_signed(window));
    let total = posts.len();
    let kept: Vec<RawPost> = posts
        .into_iter()
        .filter(|p| threshold.is_none_or(|t| p.created_at >= t))
        .collect();
    info!(days, total, kept = kept.len(), "filtered recent posts");
    kept
}
