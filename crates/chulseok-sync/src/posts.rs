//! HTTP client for the page-content fetcher service.

use async_trait::async_trait;
use chulseok_core::{FetchError, PostFetcher, RawPost};
use reqwest::Url;
use tracing::info;

use crate::SyncError;

/// Fetches board posts as JSON from `{base_url}/boards/{board}/posts?pages=N`.
pub struct HttpPostSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPostSource {
    /// `base_url` should be like `http://localhost:8080` (no trailing slash).
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn posts_url(&self, board_id: &str, pages: u32) -> Result<Url, SyncError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| SyncError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| SyncError::Url(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["boards", board_id, "posts"]);
        url.query_pairs_mut()
            .append_pair("pages", &pages.to_string());
        Ok(url)
    }

    async fn get_posts(&self, board_id: &str, pages: u32) -> Result<Vec<RawPost>, SyncError> {
        let url = self.posts_url(board_id, pages)?;
        info!(url = %url, "fetching board posts");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SyncError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let text = resp.text().await?;
        let posts: Vec<RawPost> = serde_json::from_str(&text)?;
        info!(count = posts.len(), "fetched board posts");
        Ok(posts)
    }
}

#[async_trait]
impl PostFetcher for HttpPostSource {
    async fn fetch_posts(&self, board_id: &str, pages: u32) -> Result<Vec<RawPost>, FetchError> {
        Ok(self.get_posts(board_id, pages).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_trims_trailing_slash() {
        let source = HttpPostSource::new("http://localhost:8080/".into());
        assert_eq!(source.base_url, "http://localhost:8080");
    }

    #[test]
    fn posts_url_carries_board_and_pages() {
        let source = HttpPostSource::new("http://localhost:8080/crawler".into());
        let url = source.posts_url("challenge", 3).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/crawler/boards/challenge/posts?pages=3"
        );
    }

    #[test]
    fn crawler_payload_parses_into_posts() {
        let json = r#"[{
            "identifier": "1",
            "title": "1주차 인증 김상현",
            "author": "김상현",
            "content": "",
            "created_at": "2026-03-02T09:00:00Z"
        }]"#;
        let posts: Vec<RawPost> = serde_json::from_str(json).unwrap();
        assert_eq!(posts[0].identifier, "1");
        assert_eq!(posts[0].author_identity, "김상현");
    }
}
