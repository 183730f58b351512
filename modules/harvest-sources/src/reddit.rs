// Reddit client over the public `.json` views of old.reddit.com.
// No auth; a descriptive User-Agent is required or Reddit answers 429.

use std::time::Duration;

use harvest_common::RawComment;
use tracing::{debug, info};
use url::Url;

use crate::error::{Result, SourceError};
use crate::read_json;
use crate::types::{Listing, RedditComment, RedditPost};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RedditClient {
    client: reqwest::Client,
    base_url: String,
    listing_limit: u32,
}

impl RedditClient {
    pub fn new(base_url: &str, user_agent: &str, listing_limit: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            listing_limit,
        })
    }

    /// Absolute permalinks of the newest posts in a subreddit, in listing order.
    pub async fn subreddit_posts(&self, subreddit: &str) -> Result<Vec<String>> {
        if subreddit.is_empty() || subreddit.contains('/') {
            return Err(SourceError::InvalidTarget(format!("subreddit {subreddit:?}")));
        }
        let url = format!(
            "{}/r/{}/new/.json?raw_json=1&limit={}",
            self.base_url, subreddit, self.listing_limit
        );
        info!(subreddit, limit = self.listing_limit, "reddit: listing new posts");

        let listing: Listing = read_json(self.client.get(&url).send().await?).await?;
        let posts = post_permalinks(&listing, &self.base_url);

        info!(subreddit, count = posts.len(), "reddit: listed posts");
        Ok(posts)
    }

    /// All comments of a thread, flattened depth-first.
    pub async fn thread_comments(&self, post_url: &str) -> Result<Vec<RawComment>> {
        let url = thread_json_url(post_url)?;
        debug!(post_url, json_url = %url, "reddit: fetching thread");

        let listings: Vec<Listing> = read_json(self.client.get(url).send().await?).await?;
        let comments = match listings.get(1) {
            Some(listing) => flatten_comments(listing),
            None => Vec::new(),
        };

        info!(post_url, count = comments.len(), "reddit: fetched comments");
        Ok(comments)
    }
}

/// `https://old.reddit.com/r/x/comments/id/slug/?utm=1` →
/// `https://old.reddit.com/r/x/comments/id/slug.json?raw_json=1`
pub fn thread_json_url(post_url: &str) -> Result<Url> {
    let mut url = Url::parse(post_url)
        .map_err(|e| SourceError::InvalidTarget(format!("{post_url}: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(SourceError::InvalidTarget(format!(
            "{post_url}: only http/https URLs are allowed"
        )));
    }

    let path = url.path().trim_end_matches('/').to_string();
    if path.is_empty() {
        return Err(SourceError::InvalidTarget(format!("{post_url}: no thread path")));
    }
    let path = if path.ends_with(".json") { path } else { format!("{path}.json") };

    url.set_path(&path);
    url.set_fragment(None);
    url.set_query(Some("raw_json=1"));
    Ok(url)
}

fn post_permalinks(listing: &Listing, base_url: &str) -> Vec<String> {
    listing
        .data
        .children
        .iter()
        .filter(|thing| thing.kind == "t3")
        .filter_map(|thing| serde_json::from_value::<RedditPost>(thing.data.clone()).ok())
        .filter_map(|post| post.permalink)
        .map(|permalink| {
            if permalink.starts_with("http") {
                permalink
            } else {
                format!("{base_url}{permalink}")
            }
        })
        .collect()
}

/// Walk a comment listing depth-first so every parent precedes its replies.
/// `more` stubs and malformed children are skipped.
pub(crate) fn flatten_comments(listing: &Listing) -> Vec<RawComment> {
    let mut out = Vec::new();
    walk(listing, &mut out);
    out
}

fn walk(listing: &Listing, out: &mut Vec<RawComment>) {
    for thing in &listing.data.children {
        if thing.kind != "t1" {
            continue;
        }
        let Ok(comment) = serde_json::from_value::<RedditComment>(thing.data.clone()) else {
            continue;
        };

        let is_reply = comment
            .parent_id
            .as_deref()
            .is_some_and(|p| p.starts_with("t1_"));

        out.push(RawComment {
            original_id: comment.name.clone(),
            text: comment.body.as_deref().unwrap_or_default().trim().to_string(),
            author: comment.author.clone().filter(|a| !a.is_empty()),
            is_reply,
            parent_original_id: if is_reply { comment.parent_id.clone() } else { None },
        });

        if comment.replies.is_object() {
            if let Ok(replies) = serde_json::from_value::<Listing>(comment.replies) {
                walk(&replies, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubResponse, StubServer};

    fn thread_fixture() -> Vec<Listing> {
        serde_json::from_str(
            r#"[
              {"kind": "Listing", "data": {"children": [
                {"kind": "t3", "data": {"name": "t3_p1", "permalink": "/r/rust/comments/p1/x/"}}
              ], "after": null}},
              {"kind": "Listing", "data": {"children": [
                {"kind": "t1", "data": {
                  "name": "t1_a", "body": "  top level  ", "author": "alice", "parent_id": "t3_p1",
                  "replies": {"kind": "Listing", "data": {"children": [
                    {"kind": "t1", "data": {
                      "name": "t1_b", "body": "a reply", "author": "bob", "parent_id": "t1_a",
                      "replies": ""
                    }},
                    {"kind": "more", "data": {"count": 3, "children": ["t1_z"]}}
                  ], "after": null}}
                }},
                {"kind": "t1", "data": {
                  "name": "t1_c", "body": "", "author": "", "parent_id": "t3_p1", "replies": ""
                }}
              ], "after": null}}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn flattens_depth_first_with_reply_linkage() {
        let listings = thread_fixture();
        let comments = flatten_comments(&listings[1]);

        let ids: Vec<_> = comments.iter().map(|c| c.original_id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["t1_a", "t1_b", "t1_c"]);

        assert_eq!(comments[0].text, "top level");
        assert!(!comments[0].is_reply);
        assert_eq!(comments[0].parent_original_id, None);

        assert!(comments[1].is_reply);
        assert_eq!(comments[1].parent_original_id.as_deref(), Some("t1_a"));
        assert_eq!(comments[1].author.as_deref(), Some("bob"));

        assert_eq!(comments[2].author, None);
        assert!(comments[2].is_blank());
    }

    #[test]
    fn permalinks_are_made_absolute() {
        let listings = thread_fixture();
        assert_eq!(
            post_permalinks(&listings[0], "https://old.reddit.com"),
            vec!["https://old.reddit.com/r/rust/comments/p1/x/"]
        );
    }

    #[test]
    fn json_url_strips_query_and_trailing_slash() {
        let url = thread_json_url("https://old.reddit.com/r/rust/comments/p1/x/?utm_source=share#c").unwrap();
        assert_eq!(url.as_str(), "https://old.reddit.com/r/rust/comments/p1/x.json?raw_json=1");
    }

    const THREAD_BODY: &str = r#"[
      {"kind": "Listing", "data": {"children": []}},
      {"kind": "Listing", "data": {"children": [
        {"kind": "t1", "data": {"name": "t1_a", "body": "hello", "author": "alice", "parent_id": "t3_p1", "replies": ""}}
      ]}}
    ]"#;

    fn client(server: &StubServer) -> RedditClient {
        RedditClient::new(&server.url(), "harvest-test/0.1", 5).unwrap()
    }

    #[tokio::test]
    async fn subreddit_listing_over_http() {
        let server = StubServer::start(|req| match req.path.as_str() {
            "/r/rust/new/.json" => StubResponse::json(
                r#"{"kind": "Listing", "data": {"children": [
                  {"kind": "t3", "data": {"permalink": "/r/rust/comments/p1/first/"}},
                  {"kind": "t3", "data": {"permalink": "https://old.reddit.com/r/rust/comments/p2/second/"}},
                  {"kind": "t1", "data": {"name": "t1_stray"}}
                ]}}"#,
            ),
            _ => StubResponse::not_found(),
        })
        .await;

        let posts = client(&server).subreddit_posts("rust").await.unwrap();

        assert_eq!(
            posts,
            vec![
                format!("{}/r/rust/comments/p1/first/", server.url()),
                "https://old.reddit.com/r/rust/comments/p2/second/".to_string(),
            ]
        );
        let request = &server.requests()[0];
        assert_eq!(request.query_param("limit").as_deref(), Some("5"));
        assert_eq!(request.query_param("raw_json").as_deref(), Some("1"));
        assert_eq!(request.header("user-agent"), Some("harvest-test/0.1"));
    }

    #[tokio::test]
    async fn thread_comments_over_http() {
        let server = StubServer::start(|req| match req.path.as_str() {
            "/r/rust/comments/p1/first.json" => StubResponse::json(THREAD_BODY),
            _ => StubResponse::not_found(),
        })
        .await;

        let post_url = format!("{}/r/rust/comments/p1/first/", server.url());
        let comments = client(&server).thread_comments(&post_url).await.unwrap();

        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].original_id.as_deref(), Some("t1_a"));
        assert_eq!(comments[0].text, "hello");
    }

    #[tokio::test]
    async fn error_status_is_an_api_error() {
        let server = StubServer::start(|_| StubResponse::status(429, "Too Many Requests")).await;

        let err = client(&server).subreddit_posts("rust").await.unwrap_err();

        match err {
            SourceError::Api { status, message } => {
                assert_eq!(status, 429);
                assert!(message.contains("Too Many Requests"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error() {
        let server = StubServer::start(|_| StubResponse::json("<html>blocked</html>")).await;

        let post_url = format!("{}/r/rust/comments/p1/first/", server.url());
        let err = client(&server).thread_comments(&post_url).await.unwrap_err();

        assert!(matches!(err, SourceError::Parse(_)), "got {err:?}");
    }

    #[test]
    fn json_url_rejects_non_http() {
        assert!(matches!(
            thread_json_url("file:///etc/passwd"),
            Err(SourceError::InvalidTarget(_))
        ));
        assert!(thread_json_url("not a url").is_err());
    }
}
