use std::sync::Arc;
use std::time::Duration;

use harvest_common::{CommentRecord, RawComment, Seed, UNKNOWN_AUTHOR};
use harvest_store::{CrawlStore, IdentityMap, Ledger, LedgerDomain, StoreError};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{CrawlError, Result};
use crate::retry::RetryPolicy;
use crate::stats::{SourceStats, UnitStats};
use crate::traits::{CommentSink, CommentSource, RelevanceGate};

/// Rate-limit pauses between comments and between units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub comment_pause: Duration,
    pub unit_pause: Duration,
}

impl Pacing {
    pub fn none() -> Self {
        Self {
            comment_pause: Duration::ZERO,
            unit_pause: Duration::ZERO,
        }
    }
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            comment_pause: Duration::from_secs(1),
            unit_pause: Duration::from_secs(2),
        }
    }
}

/// How a crawl unit ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    /// Recorded in an earlier pass; nothing was fetched.
    AlreadySeen,
    Completed(UnitStats),
}

enum CommentOutcome {
    AlreadySeen,
    Saved,
    Filtered,
}

/// Storage failures abort the unit; everything else is contained to one comment.
enum CommentError {
    Storage(StoreError),
    Processing(anyhow::Error),
}

impl From<StoreError> for CommentError {
    fn from(e: StoreError) -> Self {
        CommentError::Storage(e)
    }
}

/// The per-unit crawl state machine plus its collaborators.
pub struct Crawler {
    store: Arc<dyn CrawlStore>,
    gate: Arc<dyn RelevanceGate>,
    sink: Arc<dyn CommentSink>,
    retry: RetryPolicy,
    pacing: Pacing,
}

impl Crawler {
    pub fn new(
        store: Arc<dyn CrawlStore>,
        gate: Arc<dyn RelevanceGate>,
        sink: Arc<dyn CommentSink>,
        retry: RetryPolicy,
        pacing: Pacing,
    ) -> Self {
        Self {
            store,
            gate,
            sink,
            retry,
            pacing,
        }
    }

    /// Crawl every unit of every seed, in order. Seed and unit failures are
    /// counted and skipped; storage failures abort.
    pub async fn crawl_source(&self, source: &dyn CommentSource, seeds: &[Seed]) -> Result<SourceStats> {
        let platform = source.platform();
        let mut stats = SourceStats::default();

        for seed in seeds {
            if seed.platform() != platform {
                warn!(platform = %platform, seed = %seed, "Seed belongs to another platform, skipping");
                stats.seeds_failed += 1;
                continue;
            }
            let label = format!("resolve {seed}");
            let units = match self.retry.run(&label, || source.resolve_units(seed)).await {
                Ok(units) => units,
                Err(e) => {
                    warn!(platform = %platform, seed = %seed, error = %e, "Failed to resolve seed, skipping");
                    stats.seeds_failed += 1;
                    continue;
                }
            };
            info!(platform = %platform, seed = %seed, units = units.len(), "Resolved seed");

            for unit in &units {
                match self.crawl_unit(source, unit).await {
                    Ok(UnitOutcome::AlreadySeen) => stats.units_skipped += 1,
                    Ok(UnitOutcome::Completed(unit_stats)) => {
                        stats.add_unit(&unit_stats);
                        info!(
                            platform = %platform,
                            unit = unit.as_str(),
                            fetched = unit_stats.comments_fetched,
                            saved = unit_stats.comments_saved,
                            failed = unit_stats.comments_failed,
                            "Unit complete"
                        );
                        pause(self.pacing.unit_pause).await;
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(platform = %platform, error = %e, "Unit abandoned for this cycle");
                        stats.units_failed += 1;
                        pause(self.pacing.unit_pause).await;
                    }
                }
            }
        }

        Ok(stats)
    }

    /// Run one unit through check-seen, fetch, per-comment processing and
    /// mark-seen. A fetch that fails every attempt leaves the unit unseen.
    pub async fn crawl_unit(&self, source: &dyn CommentSource, unit: &str) -> Result<UnitOutcome> {
        if self.store.has(LedgerDomain::Units, unit).await? {
            info!(unit, "Unit already seen, skipping");
            return Ok(UnitOutcome::AlreadySeen);
        }

        let label = format!("fetch {unit}");
        let comments = self
            .retry
            .run(&label, || source.fetch_comments(unit))
            .await
            .map_err(|e| CrawlError::UnitFetch {
                unit: unit.to_string(),
                source: e,
            })?;
        debug!(unit, comments = comments.len(), "Fetched unit");

        let mut stats = UnitStats::default();
        for comment in &comments {
            let original_id = comment.tracking_id(unit);
            match self.process_comment(unit, &original_id, comment).await {
                Ok(CommentOutcome::AlreadySeen) => continue,
                Ok(CommentOutcome::Saved) => {
                    stats.comments_fetched += 1;
                    stats.comments_saved += 1;
                }
                Ok(CommentOutcome::Filtered) => stats.comments_fetched += 1,
                Err(CommentError::Storage(e)) => return Err(e.into()),
                Err(CommentError::Processing(e)) => {
                    stats.comments_fetched += 1;
                    stats.comments_failed += 1;
                    let err = CrawlError::CommentProcessing {
                        unit: unit.to_string(),
                        comment_id: original_id,
                        source: e,
                    };
                    warn!(error = %err, "Comment left unseen for a later cycle");
                }
            }
            pause(self.pacing.comment_pause).await;
        }

        self.store.record(LedgerDomain::Units, unit).await?;
        Ok(UnitOutcome::Completed(stats))
    }

    async fn process_comment(
        &self,
        unit: &str,
        original_id: &str,
        comment: &RawComment,
    ) -> std::result::Result<CommentOutcome, CommentError> {
        if self.store.has(LedgerDomain::Comments, original_id).await? {
            return Ok(CommentOutcome::AlreadySeen);
        }

        // Only emitted comments are bound, so a filtered or unknown parent resolves to nothing.
        let parent_id = match comment.parent_original_id.as_deref() {
            Some(parent) if comment.is_reply => self.store.resolve(parent).await?,
            _ => None,
        };

        let relevant = if comment.is_blank() {
            false
        } else {
            self.gate
                .classify(&comment.text)
                .await
                .map_err(CommentError::Processing)?
        };

        if !relevant {
            self.store.record(LedgerDomain::Comments, original_id).await?;
            return Ok(CommentOutcome::Filtered);
        }

        let internal_id = Uuid::new_v4().to_string();
        let record = CommentRecord {
            id: internal_id.clone(),
            text: comment.text.clone(),
            author: comment
                .author
                .clone()
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
            url: unit.to_string(),
            is_reply: comment.is_reply,
            parent_id,
        };
        self.sink
            .append(&record)
            .await
            .map_err(CommentError::Processing)?;

        self.store.record(LedgerDomain::Comments, original_id).await?;
        self.store.bind(original_id, &internal_id).await?;
        debug!(unit, original_id, internal_id = internal_id.as_str(), "Comment saved");
        Ok(CommentOutcome::Saved)
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
