pub mod crawl;
pub mod cycle;
pub mod error;
pub mod gate;
pub mod retry;
pub mod sink;
pub mod stats;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use crawl::{Crawler, Pacing, UnitOutcome};
pub use cycle::run_cycle;
pub use error::{CrawlError, Result};
pub use retry::{FetchError, RetryPolicy};
pub use stats::{CycleStats, SourceStats, UnitStats};
pub use traits::{CommentSink, CommentSource, RelevanceGate};
