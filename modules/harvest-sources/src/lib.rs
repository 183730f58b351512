pub mod error;
pub mod reddit;
pub mod types;
pub mod youtube;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{Result, SourceError};
pub use reddit::RedditClient;
pub use youtube::YouTubeClient;

/// Check the status, then decode the body. A body that is not the expected
/// JSON is a `SourceError::Parse`, not a network error.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let body = ensure_success(resp).await?.text().await?;
    Ok(serde_json::from_str(&body)?)
}

/// Read a response body, turning non-2xx statuses into `SourceError::Api`.
pub(crate) async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SourceError::Api {
        status: status.as_u16(),
        message: body,
    })
}
