// Trait seams of the crawl loop.
//
// CommentSource: per-platform seed expansion and comment fetch.
// RelevanceGate: boolean predicate over comment text.
// CommentSink: append-only log of accepted comments.
//
// Ledger and identity map traits live in harvest-store. Mocks for all of
// these are in `crate::testing`.

use anyhow::Result;
use async_trait::async_trait;

use harvest_common::{CommentRecord, Platform, RawComment, Seed};
use harvest_sources::youtube::canonical_video_url;
use harvest_sources::{RedditClient, YouTubeClient};

/// How many recent uploads a YouTube channel seed expands to.
const CHANNEL_UPLOADS_LIMIT: u32 = 10;

// ---------------------------------------------------------------------------
// CommentSource
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CommentSource: Send + Sync {
    fn platform(&self) -> Platform;

    /// Expand a seed into crawl-unit identifiers, in crawl order.
    async fn resolve_units(&self, seed: &Seed) -> Result<Vec<String>>;

    /// All comments of one unit, normalized.
    async fn fetch_comments(&self, unit: &str) -> Result<Vec<RawComment>>;
}

#[async_trait]
impl CommentSource for RedditClient {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    async fn resolve_units(&self, seed: &Seed) -> Result<Vec<String>> {
        match seed {
            Seed::RedditPost(url) => Ok(vec![url.clone()]),
            Seed::Subreddit(name) => Ok(self.subreddit_posts(name).await?),
            other => anyhow::bail!("reddit source cannot expand {other}"),
        }
    }

    async fn fetch_comments(&self, unit: &str) -> Result<Vec<RawComment>> {
        Ok(self.thread_comments(unit).await?)
    }
}

#[async_trait]
impl CommentSource for YouTubeClient {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    async fn resolve_units(&self, seed: &Seed) -> Result<Vec<String>> {
        match seed {
            // Same ledger key whether the video came from a seed or a channel.
            Seed::YouTubeVideo(_) => match canonical_video_url(seed.value()) {
                Some(url) => Ok(vec![url]),
                None => anyhow::bail!("no video id in {seed}"),
            },
            Seed::YouTubeChannel(channel) => {
                Ok(self.channel_videos(channel, CHANNEL_UPLOADS_LIMIT).await?)
            }
            other => anyhow::bail!("youtube source cannot expand {other}"),
        }
    }

    async fn fetch_comments(&self, unit: &str) -> Result<Vec<RawComment>> {
        Ok(self.video_comments(unit).await?)
    }
}

// ---------------------------------------------------------------------------
// RelevanceGate
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RelevanceGate: Send + Sync {
    /// Never called with empty or whitespace-only text.
    async fn classify(&self, text: &str) -> Result<bool>;

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// CommentSink
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CommentSink: Send + Sync {
    /// Append one record. Never rewrites earlier records.
    async fn append(&self, record: &CommentRecord) -> Result<()>;
}
