use async_trait::async_trait;

use crate::error::Result;

/// The two key spaces of the seen-ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerDomain {
    /// Posts, threads and videos.
    Units,
    Comments,
}

/// Set-membership store. No payload, no deletion, no enumeration.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn has(&self, domain: LedgerDomain, id: &str) -> Result<bool>;

    /// Idempotent: recording an id that is already present is a no-op.
    async fn record(&self, domain: LedgerDomain, id: &str) -> Result<()>;
}

/// Maps source-native comment ids to the internal ids they were emitted under.
#[async_trait]
pub trait IdentityMap: Send + Sync {
    async fn resolve(&self, original_id: &str) -> Result<Option<String>>;

    /// Upsert: a second bind for the same key replaces the first.
    async fn bind(&self, original_id: &str, internal_id: &str) -> Result<()>;
}

/// Everything the crawl loop needs from storage.
pub trait CrawlStore: Ledger + IdentityMap {}

impl<T: Ledger + IdentityMap> CrawlStore for T {}
