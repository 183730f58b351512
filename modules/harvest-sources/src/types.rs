use serde::Deserialize;

// --- Reddit listing types ---

/// A Reddit `Listing` envelope, as returned by the public `.json` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Listing {
    pub data: ListingData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub children: Vec<Thing>,
}

/// A listing child. `data` stays untyped until `kind` says what it is
/// (`t1` comment, `t3` post, `more` stub).
#[derive(Debug, Clone, Deserialize)]
pub struct Thing {
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// `data` of a `t1` thing.
#[derive(Debug, Clone, Deserialize)]
pub struct RedditComment {
    /// Fullname, e.g. `t1_k2x9a`.
    pub name: Option<String>,
    pub body: Option<String>,
    pub author: Option<String>,
    /// Fullname of the parent: `t1_…` for replies, `t3_…` for top-level comments.
    pub parent_id: Option<String>,
    /// Either an empty string or a nested `Listing`.
    #[serde(default)]
    pub replies: serde_json::Value,
}

/// `data` of a `t3` thing.
#[derive(Debug, Clone, Deserialize)]
pub struct RedditPost {
    pub permalink: Option<String>,
}

// --- YouTube Data API v3 types ---

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadList {
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<CommentThread>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentThread {
    pub snippet: CommentThreadSnippet,
    pub replies: Option<CommentThreadReplies>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadSnippet {
    pub top_level_comment: YouTubeComment,
    /// Replies that exist; the thread inlines at most a handful of them.
    #[serde(default)]
    pub total_reply_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentThreadReplies {
    #[serde(default)]
    pub comments: Vec<YouTubeComment>,
}

/// `comments.list?parentId=` response: every reply of one thread.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentList {
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub items: Vec<YouTubeComment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeComment {
    pub id: Option<String>,
    pub snippet: YouTubeCommentSnippet,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeCommentSnippet {
    pub text_original: Option<String>,
    pub text_display: Option<String>,
    pub author_display_name: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelList {
    #[serde(default)]
    pub items: Vec<Channel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub content_details: ChannelContentDetails,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelContentDetails {
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelatedPlaylists {
    pub uploads: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItemList {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub content_details: PlaylistItemContentDetails,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemContentDetails {
    pub video_id: Option<String>,
}
