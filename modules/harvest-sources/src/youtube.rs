// YouTube Data API v3 client: comment threads for a video, recent uploads
// for a channel.

use std::time::Duration;

use harvest_common::RawComment;
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use crate::error::{Result, SourceError};
use crate::read_json;
use crate::types::{
    ChannelList, CommentList, CommentThread, CommentThreadList, PlaylistItemList, YouTubeComment,
};

const BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PAGE_SIZE: u32 = 100;
const VIDEO_ID_LEN: usize = 11;

pub struct YouTubeClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    max_pages: u32,
}

impl YouTubeClient {
    pub fn new(api_key: &str, max_pages: u32) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
            api_key: api_key.to_string(),
            max_pages: max_pages.max(1),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<T> {
        let resp = self
            .client
            .get(format!("{}/{endpoint}", self.base_url))
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;
        read_json(resp).await
    }

    /// Every comment of a video: each thread's top-level comment followed by
    /// all of its replies. Videos with comments disabled yield an empty list.
    /// Running out of pages before the last one is an `Incomplete` error, so
    /// a truncated video is never treated as fully read.
    pub async fn video_comments(&self, video: &str) -> Result<Vec<RawComment>> {
        let video_id = extract_video_id(video)
            .ok_or_else(|| SourceError::InvalidTarget(format!("no video id in {video:?}")))?;

        let mut comments = Vec::new();
        let mut page_token: Option<String> = None;

        for page in 0..self.max_pages {
            let mut query: Vec<(&str, String)> = vec![
                ("part", "snippet,replies".to_string()),
                ("videoId", video_id.clone()),
                ("maxResults", PAGE_SIZE.to_string()),
                ("textFormat", "plainText".to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let list: CommentThreadList = match self.get_json("commentThreads", &query).await {
                Ok(list) => list,
                Err(SourceError::Api { status: 403, message }) if message.contains("commentsDisabled") => {
                    info!(video_id = %video_id, "youtube: comments disabled");
                    return Ok(Vec::new());
                }
                Err(e) => return Err(e),
            };
            debug!(video_id = %video_id, page, threads = list.items.len(), "youtube: fetched comment page");

            for thread in &list.items {
                let fetched = match reply_parent(thread) {
                    Some(parent) => Some(self.thread_replies(parent).await?),
                    None => None,
                };
                comments.extend(normalize_thread(thread, fetched.as_deref()));
            }

            match list.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => {
                    info!(video_id = %video_id, count = comments.len(), "youtube: fetched comments");
                    return Ok(comments);
                }
            }
        }

        Err(SourceError::Incomplete(format!(
            "video {video_id} has more than {} pages of comment threads",
            self.max_pages
        )))
    }

    /// All replies under one top-level comment, oldest first.
    async fn thread_replies(&self, parent_id: &str) -> Result<Vec<YouTubeComment>> {
        let mut replies = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..self.max_pages {
            let mut query: Vec<(&str, String)> = vec![
                ("part", "snippet".to_string()),
                ("parentId", parent_id.to_string()),
                ("maxResults", PAGE_SIZE.to_string()),
                ("textFormat", "plainText".to_string()),
            ];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            let list: CommentList = self.get_json("comments", &query).await?;
            replies.extend(list.items);

            match list.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => {
                    debug!(parent_id, count = replies.len(), "youtube: fetched thread replies");
                    return Ok(replies);
                }
            }
        }

        Err(SourceError::Incomplete(format!(
            "thread {parent_id} has more than {} pages of replies",
            self.max_pages
        )))
    }

    /// Watch URLs of a channel's most recent uploads, newest first.
    pub async fn channel_videos(&self, channel: &str, limit: u32) -> Result<Vec<String>> {
        let playlist_id = match parse_channel_ref(channel) {
            Some(ChannelRef::Id(id)) => uploads_playlist_id(&id)
                .ok_or_else(|| SourceError::InvalidTarget(format!("channel id {id:?}")))?,
            Some(ChannelRef::Handle(handle)) => self.uploads_playlist_for_handle(&handle).await?,
            None => {
                return Err(SourceError::InvalidTarget(format!("channel {channel:?}")));
            }
        };

        let list: PlaylistItemList = self
            .get_json(
                "playlistItems",
                &[
                    ("part", "contentDetails".to_string()),
                    ("playlistId", playlist_id.clone()),
                    ("maxResults", limit.clamp(1, 50).to_string()),
                ],
            )
            .await?;

        let videos: Vec<String> = list
            .items
            .into_iter()
            .filter_map(|item| item.content_details.video_id)
            .map(|id| watch_url(&id))
            .collect();

        info!(channel, playlist_id = %playlist_id, count = videos.len(), "youtube: listed channel uploads");
        Ok(videos)
    }

    async fn uploads_playlist_for_handle(&self, handle: &str) -> Result<String> {
        let list: ChannelList = self
            .get_json(
                "channels",
                &[
                    ("part", "contentDetails".to_string()),
                    ("forHandle", format!("@{handle}")),
                ],
            )
            .await?;

        list.items
            .into_iter()
            .find_map(|c| c.content_details.related_playlists.uploads)
            .ok_or_else(|| SourceError::InvalidTarget(format!("no uploads playlist for @{handle}")))
    }
}

fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/// The watch URL for any accepted video reference, so a bare id, a
/// `youtu.be` link and a channel upload all name the same unit.
pub fn canonical_video_url(input: &str) -> Option<String> {
    extract_video_id(input).map(|id| watch_url(&id))
}

fn normalize_comment(comment: &YouTubeComment, parent: Option<&str>) -> RawComment {
    let snippet = &comment.snippet;
    let text = snippet
        .text_original
        .as_deref()
        .or(snippet.text_display.as_deref())
        .unwrap_or_default()
        .trim()
        .to_string();
    let parent_original_id = parent
        .map(|p| p.to_string())
        .or_else(|| snippet.parent_id.clone());

    RawComment {
        original_id: comment.id.clone().filter(|id| !id.is_empty()),
        text,
        author: snippet.author_display_name.clone().filter(|a| !a.is_empty()),
        is_reply: parent_original_id.is_some(),
        parent_original_id,
    }
}

/// Top-level id of a thread whose replies are not all inlined.
fn reply_parent(thread: &CommentThread) -> Option<&str> {
    let inline = thread.replies.as_ref().map_or(0, |r| r.comments.len());
    if thread.snippet.total_reply_count as usize <= inline {
        return None;
    }
    thread
        .snippet
        .top_level_comment
        .id
        .as_deref()
        .filter(|id| !id.is_empty())
}

/// The top-level comment, then `fetched` replies if given, else the inlined ones.
fn normalize_thread(thread: &CommentThread, fetched: Option<&[YouTubeComment]>) -> Vec<RawComment> {
    let top = &thread.snippet.top_level_comment;
    let inline = thread.replies.as_ref().map(|r| r.comments.as_slice()).unwrap_or_default();
    let replies = fetched.unwrap_or(inline);

    let mut out = Vec::with_capacity(1 + replies.len());
    out.push(normalize_comment(top, None));
    for reply in replies {
        let parent = reply.snippet.parent_id.as_deref().or(top.id.as_deref());
        out.push(normalize_comment(reply, parent));
    }
    out
}

/// Video id from a watch, short, embed or youtu.be URL, or a bare id.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if is_video_id(input) {
        return Some(input.to_string());
    }

    let url = Url::parse(input).ok()?;
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let candidate = match host {
        "youtu.be" => url.path_segments()?.next().map(|s| s.to_string()),
        "youtube.com" | "music.youtube.com" => {
            let mut segments = url.path_segments()?;
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                Some("shorts") | Some("embed") | Some("live") => segments.next().map(|s| s.to_string()),
                _ => None,
            }
        }
        _ => None,
    }?;

    is_video_id(&candidate).then_some(candidate)
}

fn is_video_id(s: &str) -> bool {
    s.len() == VIDEO_ID_LEN
        && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[derive(Debug, PartialEq, Eq)]
pub enum ChannelRef {
    Id(String),
    Handle(String),
}

/// Accepts `UC…` ids, `@handle`, and `/channel/UC…` or `/@handle` URLs.
pub fn parse_channel_ref(input: &str) -> Option<ChannelRef> {
    let input = input.trim();
    if let Some(handle) = input.strip_prefix('@') {
        return (!handle.is_empty()).then(|| ChannelRef::Handle(handle.to_string()));
    }
    if input.starts_with("UC") && !input.contains('/') {
        return Some(ChannelRef::Id(input.to_string()));
    }

    let url = Url::parse(input).ok()?;
    let mut segments = url.path_segments()?;
    match segments.next()? {
        "channel" => segments.next().map(|id| ChannelRef::Id(id.to_string())),
        s if s.starts_with('@') && s.len() > 1 => Some(ChannelRef::Handle(s[1..].to_string())),
        _ => None,
    }
}

/// Every channel's uploads playlist is its id with `UC` replaced by `UU`.
pub fn uploads_playlist_id(channel_id: &str) -> Option<String> {
    channel_id
        .strip_prefix("UC")
        .filter(|rest| !rest.is_empty())
        .map(|rest| format!("UU{rest}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubResponse, StubServer};

    #[test]
    fn extracts_video_ids_from_common_shapes() {
        let id = "dQw4w9WgXcQ";
        for input in [
            "dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?t=42",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://m.youtube.com/embed/dQw4w9WgXcQ",
        ] {
            assert_eq!(extract_video_id(input).as_deref(), Some(id), "{input}");
        }
    }

    #[test]
    fn rejects_non_video_urls() {
        assert_eq!(extract_video_id("https://www.youtube.com/@somechannel"), None);
        assert_eq!(extract_video_id("https://example.com/watch?v=dQw4w9WgXcQ"), None);
        assert_eq!(extract_video_id("too-short"), None);
    }

    #[test]
    fn channel_refs() {
        assert_eq!(
            parse_channel_ref("UCxyz123"),
            Some(ChannelRef::Id("UCxyz123".into()))
        );
        assert_eq!(
            parse_channel_ref("@rustlang"),
            Some(ChannelRef::Handle("rustlang".into()))
        );
        assert_eq!(
            parse_channel_ref("https://www.youtube.com/channel/UCabc"),
            Some(ChannelRef::Id("UCabc".into()))
        );
        assert_eq!(
            parse_channel_ref("https://www.youtube.com/@rustlang/videos"),
            Some(ChannelRef::Handle("rustlang".into()))
        );
        assert_eq!(parse_channel_ref("https://www.youtube.com/watch?v=x"), None);
    }

    #[test]
    fn uploads_playlist_swaps_prefix() {
        assert_eq!(uploads_playlist_id("UCabc").as_deref(), Some("UUabc"));
        assert_eq!(uploads_playlist_id("UC"), None);
        assert_eq!(uploads_playlist_id("HCabc"), None);
    }

    const THREADS_PAGE: &str = r#"{
      "nextPageToken": "abc",
      "items": [
        {
          "snippet": {"totalReplyCount": 1, "topLevelComment": {"id": "Ugx1", "snippet": {
            "textOriginal": "first!", "textDisplay": "first!", "authorDisplayName": "@ann"
          }}},
          "replies": {"comments": [
            {"id": "Ugx1.r1", "snippet": {
              "textOriginal": " agreed ", "authorDisplayName": "@ben", "parentId": "Ugx1"
            }}
          ]}
        },
        {
          "snippet": {"topLevelComment": {"id": "Ugx2", "snippet": {
            "textDisplay": "display only"
          }}}
        }
      ]
    }"#;

    fn thread(total_replies: u32, inline_replies: usize) -> CommentThread {
        let replies: Vec<serde_json::Value> = (0..inline_replies)
            .map(|i| {
                serde_json::json!({
                    "id": format!("Ugx9.r{i}"),
                    "snippet": {"textOriginal": format!("reply {i}"), "parentId": "Ugx9"}
                })
            })
            .collect();
        serde_json::from_value(serde_json::json!({
            "snippet": {
                "totalReplyCount": total_replies,
                "topLevelComment": {"id": "Ugx9", "snippet": {"textOriginal": "top"}}
            },
            "replies": {"comments": replies}
        }))
        .unwrap()
    }

    #[test]
    fn threads_normalize_with_reply_parents() {
        let list: CommentThreadList = serde_json::from_str(THREADS_PAGE).unwrap();

        let comments: Vec<RawComment> = list
            .items
            .iter()
            .flat_map(|t| normalize_thread(t, None))
            .collect();
        assert_eq!(comments.len(), 3);

        assert_eq!(comments[0].original_id.as_deref(), Some("Ugx1"));
        assert!(!comments[0].is_reply);

        assert_eq!(comments[1].text, "agreed");
        assert!(comments[1].is_reply);
        assert_eq!(comments[1].parent_original_id.as_deref(), Some("Ugx1"));

        assert_eq!(comments[2].text, "display only");
        assert_eq!(comments[2].author, None);
    }

    #[test]
    fn partially_inlined_thread_needs_its_replies_fetched() {
        assert_eq!(reply_parent(&thread(7, 2)), Some("Ugx9"));
        assert_eq!(reply_parent(&thread(2, 2)), None);
        assert_eq!(reply_parent(&thread(0, 0)), None);
    }

    #[test]
    fn fetched_replies_replace_the_inlined_ones() {
        let full = thread(7, 2);
        let fetched: Vec<YouTubeComment> = (0..7)
            .map(|i| {
                serde_json::from_value(serde_json::json!({
                    "id": format!("Ugx9.f{i}"),
                    "snippet": {"textOriginal": format!("fetched {i}"), "parentId": "Ugx9"}
                }))
                .unwrap()
            })
            .collect();

        let comments = normalize_thread(&full, Some(&fetched));

        assert_eq!(comments.len(), 8);
        assert!(comments[1..].iter().all(|c| c.is_reply));
        assert!(comments[1..]
            .iter()
            .all(|c| c.parent_original_id.as_deref() == Some("Ugx9")));
        assert_eq!(comments[7].text, "fetched 6");
    }

    #[test]
    fn canonical_urls_agree_across_reference_shapes() {
        let expected = Some("https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string());
        assert_eq!(canonical_video_url("dQw4w9WgXcQ"), expected);
        assert_eq!(canonical_video_url("https://youtu.be/dQw4w9WgXcQ?t=42"), expected);
        assert_eq!(canonical_video_url("https://www.youtube.com/shorts/dQw4w9WgXcQ"), expected);
        assert_eq!(canonical_video_url("https://www.youtube.com/@channel"), None);
    }

    // -----------------------------------------------------------------------
    // Over HTTP
    // -----------------------------------------------------------------------

    fn client(server: &StubServer, max_pages: u32) -> YouTubeClient {
        YouTubeClient::new("test-key", max_pages)
            .unwrap()
            .with_base_url(&server.url())
    }

    const VIDEO: &str = "https://youtu.be/dQw4w9WgXcQ";

    #[tokio::test]
    async fn pages_threads_and_fetches_missing_replies() {
        let server = StubServer::start(|req| match req.path.as_str() {
            "/commentThreads" => match req.query_param("pageToken").as_deref() {
                None => StubResponse::json(
                    r#"{"nextPageToken": "p2", "items": [
                      {"snippet": {"totalReplyCount": 3, "topLevelComment": {"id": "T1", "snippet": {"textOriginal": "one"}}},
                       "replies": {"comments": [{"id": "T1.a", "snippet": {"textOriginal": "inline", "parentId": "T1"}}]}}
                    ]}"#,
                ),
                Some("p2") => StubResponse::json(
                    r#"{"items": [
                      {"snippet": {"topLevelComment": {"id": "T2", "snippet": {"textOriginal": "two"}}}}
                    ]}"#,
                ),
                Some(_) => StubResponse::not_found(),
            },
            "/comments" => match req.query_param("pageToken").as_deref() {
                None => StubResponse::json(
                    r#"{"nextPageToken": "r2", "items": [
                      {"id": "T1.a", "snippet": {"textOriginal": "inline", "parentId": "T1"}},
                      {"id": "T1.b", "snippet": {"textOriginal": "second", "parentId": "T1"}}
                    ]}"#,
                ),
                Some("r2") => StubResponse::json(
                    r#"{"items": [{"id": "T1.c", "snippet": {"textOriginal": "third", "parentId": "T1"}}]}"#,
                ),
                Some(_) => StubResponse::not_found(),
            },
            _ => StubResponse::not_found(),
        })
        .await;

        let comments = client(&server, 10).video_comments(VIDEO).await.unwrap();

        let texts: Vec<&str> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "inline", "second", "third", "two"]);
        assert_eq!(comments[3].parent_original_id.as_deref(), Some("T1"));
        assert!(!comments[4].is_reply);

        let thread_requests = server.requests_to("/commentThreads");
        assert_eq!(thread_requests.len(), 2);
        assert_eq!(thread_requests[0].query_param("videoId").as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(thread_requests[0].query_param("key").as_deref(), Some("test-key"));
        let reply_requests = server.requests_to("/comments");
        assert_eq!(reply_requests.len(), 2);
        assert_eq!(reply_requests[0].query_param("parentId").as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn page_cap_with_pages_left_is_incomplete() {
        let server = StubServer::start(|_| {
            StubResponse::json(
                r#"{"nextPageToken": "more", "items": [
                  {"snippet": {"topLevelComment": {"id": "T1", "snippet": {"textOriginal": "one"}}}}
                ]}"#,
            )
        })
        .await;

        let err = client(&server, 2).video_comments(VIDEO).await.unwrap_err();

        assert!(matches!(err, SourceError::Incomplete(_)), "got {err:?}");
        assert_eq!(server.requests_to("/commentThreads").len(), 2);
    }

    #[tokio::test]
    async fn disabled_comments_are_an_empty_video() {
        let server = StubServer::start(|_| {
            StubResponse::status(
                403,
                r#"{"error": {"code": 403, "errors": [{"reason": "commentsDisabled"}]}}"#,
            )
        })
        .await;

        let comments = client(&server, 5).video_comments(VIDEO).await.unwrap();

        assert!(comments.is_empty());
    }

    #[tokio::test]
    async fn other_forbidden_responses_stay_errors() {
        let server = StubServer::start(|_| {
            StubResponse::status(
                403,
                r#"{"error": {"code": 403, "errors": [{"reason": "quotaExceeded"}]}}"#,
            )
        })
        .await;

        let err = client(&server, 5).video_comments(VIDEO).await.unwrap_err();

        assert!(matches!(err, SourceError::Api { status: 403, .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn malformed_thread_page_is_a_parse_error() {
        let server = StubServer::start(|_| StubResponse::json(r#"{"items": "nope"}"#)).await;

        let err = client(&server, 5).video_comments(VIDEO).await.unwrap_err();

        assert!(matches!(err, SourceError::Parse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn channel_id_lists_its_uploads_playlist() {
        let server = StubServer::start(|req| match req.path.as_str() {
            "/playlistItems" => StubResponse::json(
                r#"{"items": [
                  {"contentDetails": {"videoId": "aaaaaaaaaaa"}},
                  {"contentDetails": {}}
                ]}"#,
            ),
            _ => StubResponse::not_found(),
        })
        .await;

        let videos = client(&server, 5).channel_videos("UCabc", 10).await.unwrap();

        assert_eq!(videos, vec!["https://www.youtube.com/watch?v=aaaaaaaaaaa".to_string()]);
        let request = &server.requests_to("/playlistItems")[0];
        assert_eq!(request.query_param("playlistId").as_deref(), Some("UUabc"));
        assert_eq!(request.query_param("maxResults").as_deref(), Some("10"));
    }
}
