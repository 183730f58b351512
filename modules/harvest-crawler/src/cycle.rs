use std::sync::Arc;

use chrono::Utc;
use harvest_common::{Platform, SourcesFile};
use tracing::{info, warn};

use crate::crawl::Crawler;
use crate::error::Result;
use crate::stats::CycleStats;
use crate::traits::CommentSource;

/// Platforms in the order a cycle drains them.
const CYCLE_ORDER: [Platform; 2] = [Platform::Reddit, Platform::YouTube];

/// One full crawl cycle: Reddit, then YouTube, each drained before the next.
///
/// A platform with no configured seeds, or with seeds but no available
/// source, is skipped without affecting the other. Only storage failures
/// end the cycle early.
pub async fn run_cycle(
    crawler: &Crawler,
    sources: &[Arc<dyn CommentSource>],
    file: &SourcesFile,
) -> Result<CycleStats> {
    let started_at = Utc::now();
    let mut per_platform = Vec::new();

    for platform in CYCLE_ORDER {
        let seeds = file.seeds(platform);
        if seeds.is_empty() {
            info!(platform = %platform, "No seeds configured, skipping platform");
            continue;
        }
        let Some(source) = sources.iter().find(|s| s.platform() == platform) else {
            warn!(platform = %platform, seeds = seeds.len(), "Seeds configured but source unavailable, skipping");
            continue;
        };

        info!(platform = %platform, seeds = seeds.len(), "Crawling platform");
        let stats = crawler.crawl_source(source.as_ref(), &seeds).await?;
        info!(platform = %platform, %stats, "Platform complete");
        per_platform.push((platform, stats));
    }

    Ok(CycleStats {
        started_at,
        finished_at: Utc::now(),
        sources: per_platform,
    })
}
