//! Durable crawl state: the seen-ledger for units and comments, and the
//! identity map from source-native comment ids to internal ids.

pub mod error;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use sqlite::SqliteStore;
pub use traits::{CrawlStore, IdentityMap, Ledger, LedgerDomain};
