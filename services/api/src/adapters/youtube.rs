//! services/api/src/adapters/youtube.rs
//!
//! This module contains the adapter for the YouTube Data API search endpoint.
//! It implements the `VideoSearchService` port from the `core` crate.

use askpix_core::ports::VideoSearchService;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum SearchError {
    #[error("YOUTUBE_API_KEY is not configured")]
    MissingKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `VideoSearchService` using the YouTube Data API.
#[derive(Clone)]
pub struct YouTubeAdapter {
    client: reqwest::Client,
    api_base: String,
    api_key: Option<String>,
}

impl YouTubeAdapter {
    /// Creates a new `YouTubeAdapter`. Without a key every search finds nothing.
    pub fn new(api_key: Option<String>) -> Result<Self, reqwest::Error> {
        Self::with_base(YOUTUBE_API_BASE.to_string(), api_key)
    }

    pub fn with_base(api_base: String, api_key: Option<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            api_base,
            api_key,
        })
    }

    async fn search(
        &self,
        query: &str,
        language: &str,
        region_code: &str,
    ) -> Result<Option<String>, SearchError> {
        let api_key = self.api_key.as_deref().ok_or(SearchError::MissingKey)?;

        let response: SearchResponse = self
            .client
            .get(format!("{}/search", self.api_base.trim_end_matches('/')))
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", "1"),
                ("q", query),
                ("relevanceLanguage", language),
                ("regionCode", region_code),
                ("key", api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .items
            .into_iter()
            .find_map(|item| item.id.video_id)
            .filter(|id| !id.is_empty()))
    }
}

//=========================================================================================
// `VideoSearchService` Trait Implementation
//=========================================================================================

#[async_trait]
impl VideoSearchService for YouTubeAdapter {
    async fn find_video(&self, query: &str, language: &str, region_code: &str) -> Option<String> {
        match self.search(query, language, region_code).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Video search for '{}' failed: {}", query, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_finds_nothing_without_raising() {
        let adapter = YouTubeAdapter::new(None).unwrap();
        assert_eq!(adapter.find_video("newton's laws", "en", "US").await, None);
    }

    #[tokio::test]
    async fn unreachable_api_finds_nothing() {
        let adapter =
            YouTubeAdapter::with_base("http://127.0.0.1:9".to_string(), Some("key".to_string()))
                .unwrap();
        assert_eq!(adapter.find_video("photosynthesis", "hi", "IN").await, None);
    }

    #[test]
    fn first_video_id_is_taken() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"items":[{"id":{"kind":"youtube#channel"}},{"id":{"kind":"youtube#video","videoId":"abc"}}]}"#,
        )
        .unwrap();
        let id = response.items.into_iter().find_map(|item| item.id.video_id);
        assert_eq!(id.as_deref(), Some("abc"));
    }
}
