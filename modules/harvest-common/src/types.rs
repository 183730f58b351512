use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Author recorded when a source does not report one.
pub const UNKNOWN_AUTHOR: &str = "unknown";

/// Prefix of ids synthesized for comments the source did not identify.
pub const SYNTHETIC_ID_PREFIX: &str = "synthetic:";

// --- Platforms and seeds ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Reddit,
    YouTube,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Reddit => "reddit",
            Platform::YouTube => "youtube",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A configured crawl entry. Some seeds are crawl units themselves (a post or
/// a video); others expand into many units (a subreddit, a channel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Seed {
    RedditPost(String),
    Subreddit(String),
    YouTubeVideo(String),
    YouTubeChannel(String),
}

impl Seed {
    pub fn platform(&self) -> Platform {
        match self {
            Seed::RedditPost(_) | Seed::Subreddit(_) => Platform::Reddit,
            Seed::YouTubeVideo(_) | Seed::YouTubeChannel(_) => Platform::YouTube,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Seed::RedditPost(v)
            | Seed::Subreddit(v)
            | Seed::YouTubeVideo(v)
            | Seed::YouTubeChannel(v) => v,
        }
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seed::RedditPost(url) => write!(f, "reddit post {url}"),
            Seed::Subreddit(name) => write!(f, "r/{name}"),
            Seed::YouTubeVideo(url) => write!(f, "youtube video {url}"),
            Seed::YouTubeChannel(id) => write!(f, "youtube channel {id}"),
        }
    }
}

// --- Comments ---

/// A comment as normalized at the source boundary. Every source converts its
/// native shape into this before the crawl loop sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawComment {
    /// Source-native id (Reddit fullname, YouTube comment id). `None` when the
    /// source exposes no identifier.
    pub original_id: Option<String>,
    pub text: String,
    pub author: Option<String>,
    pub is_reply: bool,
    /// Source-native id of the parent comment, for replies.
    pub parent_original_id: Option<String>,
}

impl RawComment {
    /// The id this comment is tracked under in the ledger: the source-native
    /// id, or a deterministic synthesized one.
    pub fn tracking_id(&self, unit: &str) -> String {
        match self.original_id.as_deref() {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => synthesize_comment_id(
                unit,
                self.author.as_deref().unwrap_or(UNKNOWN_AUTHOR),
                self.parent_original_id.as_deref().unwrap_or(""),
                &self.text,
            ),
        }
    }

    /// True when there is nothing worth classifying.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Derive a stable id for a comment the source did not identify.
///
/// Byte-identical comments by the same author under the same parent in the
/// same unit map to the same id.
pub fn synthesize_comment_id(unit: &str, author: &str, parent: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [unit, author, parent, text] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    format!("{SYNTHETIC_ID_PREFIX}{}", hex::encode(&digest[..16]))
}

/// One line of the comment log. Field order is the on-disk key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    /// Internal id, freshly generated per emitted comment.
    pub id: String,
    pub text: String,
    pub author: String,
    /// The crawl unit the comment was harvested from.
    pub url: String,
    pub is_reply: bool,
    /// Internal id of an emitted parent, never a source-native id.
    pub parent_id: Option<String>,
}
