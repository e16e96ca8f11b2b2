//! crates/askpix_core/src/tools.rs
//!
//! Model-callable tools.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use crate::ports::{Tool, VideoSearchService};

pub const VIDEO_SEARCH_TOOL: &str = "searchYoutubeVideo";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSearchArgs {
    query: String,
    #[serde(default = "default_language")]
    language: String,
    #[serde(default = "default_region")]
    region_code: String,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_region() -> String {
    "US".to_string()
}

/// Lets the model look up one tutorial video while it writes a solution.
///
/// One instance serves one solve call and remembers the id it handed out, so the
/// flow can merge it into the result when the model forgets to.
pub struct VideoSearchTool {
    videos: Arc<dyn VideoSearchService>,
    found: Mutex<Option<String>>,
}

impl VideoSearchTool {
    pub fn new(videos: Arc<dyn VideoSearchService>) -> Self {
        Self {
            videos,
            found: Mutex::new(None),
        }
    }

    /// The last video id returned to the model, if any.
    pub fn found(&self) -> Option<String> {
        match self.found.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn remember(&self, video_id: &str) {
        let mut guard = match self.found.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(video_id.to_string());
    }
}

#[async_trait]
impl Tool for VideoSearchTool {
    fn name(&self) -> &str {
        VIDEO_SEARCH_TOOL
    }

    fn description(&self) -> &str {
        "Searches YouTube for one tutorial video about a topic and returns its video id."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "query": { "type": "STRING", "description": "Search query for the tutorial." },
                "language": { "type": "STRING", "description": "Two-letter language code, e.g. en or hi." },
                "regionCode": { "type": "STRING", "description": "Two-letter region code, e.g. US or IN." }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Value {
        let args: VideoSearchArgs = match serde_json::from_value(args) {
            Ok(args) => args,
            Err(e) => {
                warn!("Video search called with invalid arguments: {}", e);
                return json!({ "videoId": null, "message": "Invalid arguments." });
            }
        };

        match self
            .videos
            .find_video(&args.query, &args.language, &args.region_code)
            .await
        {
            Some(video_id) => {
                info!("Video search for '{}' found {}", args.query, video_id);
                self.remember(&video_id);
                json!({ "videoId": video_id })
            }
            None => json!({ "videoId": null, "message": "No video found." }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedVideos(Option<&'static str>);

    #[async_trait]
    impl VideoSearchService for FixedVideos {
        async fn find_video(&self, _query: &str, _language: &str, _region: &str) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    #[tokio::test]
    async fn found_videos_are_returned_and_remembered() {
        let tool = VideoSearchTool::new(Arc::new(FixedVideos(Some("dQw4w9WgXcQ"))));
        let out = tool
            .call(json!({ "query": "integration basics", "language": "en", "regionCode": "US" }))
            .await;
        assert_eq!(out["videoId"], "dQw4w9WgXcQ");
        assert_eq!(tool.found().as_deref(), Some("dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn missing_videos_and_bad_arguments_do_not_fail() {
        let tool = VideoSearchTool::new(Arc::new(FixedVideos(None)));
        let out = tool.call(json!({ "query": "ohm's law" })).await;
        assert!(out["videoId"].is_null());

        let out = tool.call(json!({ "q": 3 })).await;
        assert!(out["videoId"].is_null());
        assert_eq!(tool.found(), None);
    }
}
