use harvest_store::StoreError;
use thiserror::Error;

use crate::retry::FetchError;

/// Result type alias for crawl operations.
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Failures of the crawl loop, by the granularity they abort.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Fetch for one unit failed on every attempt. The unit is left unseen
    /// and retried next cycle; sibling units continue.
    #[error("Fetch failed for unit {unit}: {source}")]
    UnitFetch {
        unit: String,
        #[source]
        source: FetchError,
    },

    /// Extracting, classifying or emitting one comment failed. The comment is
    /// left unseen; sibling comments continue.
    #[error("Processing failed for comment {comment_id} in {unit}: {source}")]
    CommentProcessing {
        unit: String,
        comment_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// Ledger or identity map unavailable. Fatal to the cycle.
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl CrawlError {
    /// Whether this error must abort the whole cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CrawlError::Storage(_))
    }
}
