use std::fmt;

use chrono::{DateTime, Utc};
use harvest_common::Platform;

/// Counts for one crawl unit. `comments_fetched` counts comments not seen
/// in an earlier pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UnitStats {
    pub comments_fetched: u32,
    pub comments_saved: u32,
    pub comments_failed: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SourceStats {
    pub units_fetched: u32,
    pub units_skipped: u32,
    pub units_failed: u32,
    pub seeds_failed: u32,
    pub comments_fetched: u32,
    pub comments_saved: u32,
    pub comments_failed: u32,
}

impl SourceStats {
    pub fn add_unit(&mut self, unit: &UnitStats) {
        self.units_fetched += 1;
        self.comments_fetched += unit.comments_fetched;
        self.comments_saved += unit.comments_saved;
        self.comments_failed += unit.comments_failed;
    }

    pub fn merge(&mut self, other: &SourceStats) {
        self.units_fetched += other.units_fetched;
        self.units_skipped += other.units_skipped;
        self.units_failed += other.units_failed;
        self.seeds_failed += other.seeds_failed;
        self.comments_fetched += other.comments_fetched;
        self.comments_saved += other.comments_saved;
        self.comments_failed += other.comments_failed;
    }
}

impl fmt::Display for SourceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "units fetched={} skipped={} failed={} seeds failed={} | comments fetched={} saved={} failed={}",
            self.units_fetched,
            self.units_skipped,
            self.units_failed,
            self.seeds_failed,
            self.comments_fetched,
            self.comments_saved,
            self.comments_failed,
        )
    }
}

#[derive(Debug, Clone)]
pub struct CycleStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub sources: Vec<(Platform, SourceStats)>,
}

impl CycleStats {
    pub fn totals(&self) -> SourceStats {
        let mut total = SourceStats::default();
        for (_, stats) in &self.sources {
            total.merge(stats);
        }
        total
    }

    pub fn for_platform(&self, platform: Platform) -> Option<&SourceStats> {
        self.sources
            .iter()
            .find(|(p, _)| *p == platform)
            .map(|(_, stats)| stats)
    }
}

impl fmt::Display for CycleStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        writeln!(f, "\n=== Crawl Cycle Complete ({}s) ===", elapsed.num_seconds())?;
        for (platform, stats) in &self.sources {
            writeln!(f, "{:<8} {}", platform, stats)?;
        }
        write!(f, "{:<8} {}", "total", self.totals())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_sum_sources() {
        let now = Utc::now();
        let reddit = SourceStats {
            units_fetched: 2,
            comments_fetched: 10,
            comments_saved: 4,
            ..Default::default()
        };
        let youtube = SourceStats {
            units_failed: 1,
            comments_fetched: 3,
            comments_saved: 1,
            comments_failed: 1,
            ..Default::default()
        };
        let cycle = CycleStats {
            started_at: now,
            finished_at: now,
            sources: vec![(Platform::Reddit, reddit), (Platform::YouTube, youtube)],
        };

        let total = cycle.totals();
        assert_eq!(total.units_fetched, 2);
        assert_eq!(total.units_failed, 1);
        assert_eq!(total.comments_fetched, 13);
        assert_eq!(total.comments_saved, 5);
        assert_eq!(total.comments_failed, 1);

        let rendered = cycle.to_string();
        assert!(rendered.contains("reddit"));
        assert!(rendered.contains("youtube"));
        assert!(rendered.contains("saved=5"));
    }
}
