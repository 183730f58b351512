use std::path::Path;

use serde::Deserialize;

use crate::error::{HarvestError, Result};
use crate::types::{Platform, Seed};

/// JSON list of what to crawl. Every field is optional and empty strings are
/// ignored, so a partially filled file is valid.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesFile {
    #[serde(default)]
    pub subreddits: Vec<String>,
    #[serde(default)]
    pub single_reddit_post: String,
    #[serde(default)]
    pub youtube_videos: Vec<String>,
    #[serde(default)]
    pub youtube_channels: Vec<String>,
    #[serde(default)]
    pub single_youtube_video: String,
}

impl SourcesFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| HarvestError::SourcesRead {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| HarvestError::SourcesParse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Seeds for one platform in crawl order: the single post/video first,
    /// then the configured lists.
    pub fn seeds(&self, platform: Platform) -> Vec<Seed> {
        let mut seeds = Vec::new();
        match platform {
            Platform::Reddit => {
                if let Some(post) = non_empty(&self.single_reddit_post) {
                    seeds.push(Seed::RedditPost(post));
                }
                seeds.extend(
                    self.subreddits
                        .iter()
                        .filter_map(|s| non_empty(s))
                        .map(|s| Seed::Subreddit(strip_subreddit_prefix(&s).to_string())),
                );
            }
            Platform::YouTube => {
                if let Some(video) = non_empty(&self.single_youtube_video) {
                    seeds.push(Seed::YouTubeVideo(video));
                }
                seeds.extend(
                    self.youtube_videos
                        .iter()
                        .filter_map(|v| non_empty(v))
                        .map(Seed::YouTubeVideo),
                );
                seeds.extend(
                    self.youtube_channels
                        .iter()
                        .filter_map(|c| non_empty(c))
                        .map(Seed::YouTubeChannel),
                );
            }
        }
        seeds
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn strip_subreddit_prefix(name: &str) -> &str {
    name.trim_start_matches('/')
        .trim_start_matches("r/")
        .trim_end_matches('/')
}
