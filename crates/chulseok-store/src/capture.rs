//! Post capture files: a JSON array of posts saved from an earlier crawl,
//! used in place of a live fetch.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chulseok_core::{FetchError, PostFetcher, RawPost};
use tracing::info;

use crate::LocalStoreError;

/// Read every post in a capture file.
pub fn read_capture(path: &Path) -> Result<Vec<RawPost>, LocalStoreError> {
    if !path.exists() {
        return Err(LocalStoreError::NotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path)?;
    let posts: Vec<RawPost> = serde_json::from_str(&text)?;
    info!(path = %path.display(), count = posts.len(), "read post capture");
    Ok(posts)
}

/// Serves a capture file regardless of board or page count.
pub struct FilePostSource {
    path: PathBuf,
}

impl FilePostSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PostFetcher for FilePostSource {
    async fn fetch_posts(&self, board_id: &str, _pages: u32) -> Result<Vec<RawPost>, FetchError> {
        info!(board = board_id, path = %self.path.display(), "using post capture instead of fetching");
        read_capture(&self.path).map_err(|e| FetchError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPTURE: &str = r#"[
        {
            "identifier": "501",
            "title": "*3주차 인증",
            "author": "김상현(반장)",
            "content": "",
            "created_at": "2026-03-16T21:04:00Z",
            "source_url": "https://cafe.example.com/challenge/501"
        },
        {
            "identifier": "502",
            "title": "가입인사",
            "author_identity": "이영희",
            "created_at": "2026-03-16T22:10:00+09:00"
        }
    ]"#;

    #[test]
    fn reads_both_field_spellings() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("capture.json");
        std::fs::write(&path, CAPTURE).unwrap();

        let posts = read_capture(&path).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].author_identity, "김상현(반장)");
        assert_eq!(
            posts[0].source_url.as_deref(),
            Some("https://cafe.example.com/challenge/501")
        );
        assert_eq!(posts[1].body, "");
        assert_eq!(
            posts[1].created_at,
            "2026-03-16T13:10:00Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap()
        );
    }

    #[test]
    fn malformed_capture_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("capture.json");
        std::fs::write(&path, "{ not a list").unwrap();
        assert!(matches!(read_capture(&path), Err(LocalStoreError::Json(_))));
    }

    #[tokio::test]
    async fn source_maps_errors_to_fetch_failure() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = FilePostSource::new(tmp.path().join("missing.json"));
        let err = source.fetch_posts("challenge", 3).await.unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }
}
