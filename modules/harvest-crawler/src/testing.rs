// Test mocks for the crawl loop.
//
// One mock per trait seam:
// - MockSource (CommentSource): unit→comments and seed→units maps, scripted failures
// - ScriptedGate (RelevanceGate): text set lookup, records every call
// - MemorySink (CommentSink): in-memory record log, scripted failures
// - MemoryStore (Ledger + IdentityMap): HashSet/HashMap, no I/O
// - FailingStore (Ledger + IdentityMap): every operation fails
//
// Plus RawComment builders and a Harness wiring an in-memory SqliteStore.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use harvest_common::{CommentRecord, Platform, RawComment, Seed};
use harvest_store::{IdentityMap, Ledger, LedgerDomain, SqliteStore, StoreError};

use crate::crawl::{Crawler, Pacing};
use crate::retry::RetryPolicy;
use crate::traits::{CommentSink, CommentSource, RelevanceGate};

// ---------------------------------------------------------------------------
// Comment builders
// ---------------------------------------------------------------------------

pub fn comment(id: &str, text: &str) -> RawComment {
    RawComment {
        original_id: Some(id.to_string()),
        text: text.to_string(),
        author: Some(format!("author_{id}")),
        is_reply: false,
        parent_original_id: None,
    }
}

pub fn reply(id: &str, text: &str, parent: &str) -> RawComment {
    RawComment {
        is_reply: true,
        parent_original_id: Some(parent.to_string()),
        ..comment(id, text)
    }
}

/// A comment the source gave no id or author for.
pub fn anonymous(text: &str) -> RawComment {
    RawComment {
        text: text.to_string(),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// MockSource
// ---------------------------------------------------------------------------

/// Map-based comment source. Unregistered units fail every fetch.
/// Post and video seeds resolve to themselves unless registered; listing
/// seeds must be registered with `.on_seed()`.
pub struct MockSource {
    platform: Platform,
    units: HashMap<String, Vec<RawComment>>,
    seeds: HashMap<String, Vec<String>>,
    failing_seeds: HashSet<String>,
    remaining_failures: Mutex<HashMap<String, u32>>,
    fetch_log: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            units: HashMap::new(),
            seeds: HashMap::new(),
            failing_seeds: HashSet::new(),
            remaining_failures: Mutex::new(HashMap::new()),
            fetch_log: Mutex::new(Vec::new()),
        }
    }

    pub fn on_unit(mut self, unit: &str, comments: Vec<RawComment>) -> Self {
        self.units.insert(unit.to_string(), comments);
        self
    }

    /// The first `failures` fetches of `unit` fail, later ones succeed.
    pub fn failing_unit(self, unit: &str, failures: u32) -> Self {
        if let Ok(mut remaining) = self.remaining_failures.lock() {
            remaining.insert(unit.to_string(), failures);
        }
        self
    }

    pub fn on_seed(mut self, seed: &str, units: &[&str]) -> Self {
        self.seeds
            .insert(seed.to_string(), units.iter().map(|u| u.to_string()).collect());
        self
    }

    pub fn failing_seed(mut self, seed: &str) -> Self {
        self.failing_seeds.insert(seed.to_string());
        self
    }

    /// Every fetch attempt, in order, including failed ones.
    pub fn fetches(&self) -> Vec<String> {
        self.fetch_log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn fetch_count(&self, unit: &str) -> usize {
        self.fetches().iter().filter(|u| u.as_str() == unit).count()
    }
}

#[async_trait]
impl CommentSource for MockSource {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn resolve_units(&self, seed: &Seed) -> Result<Vec<String>> {
        let value = seed.value();
        if self.failing_seeds.contains(value) {
            bail!("MockSource: seed {value} is down");
        }
        if let Some(units) = self.seeds.get(value) {
            return Ok(units.clone());
        }
        match seed {
            Seed::RedditPost(_) | Seed::YouTubeVideo(_) => Ok(vec![value.to_string()]),
            _ => bail!("MockSource: no units registered for {seed}"),
        }
    }

    async fn fetch_comments(&self, unit: &str) -> Result<Vec<RawComment>> {
        if let Ok(mut log) = self.fetch_log.lock() {
            log.push(unit.to_string());
        }
        if let Ok(mut remaining) = self.remaining_failures.lock() {
            if let Some(left) = remaining.get_mut(unit) {
                if *left > 0 {
                    *left -= 1;
                    bail!("MockSource: transient failure fetching {unit}");
                }
            }
        }
        self.units
            .get(unit)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("MockSource: no comments registered for {unit}"))
    }
}

// ---------------------------------------------------------------------------
// ScriptedGate
// ---------------------------------------------------------------------------

/// Relevant iff the text is in the relevant set (or the gate accepts all).
/// Texts in the failing set return an error.
pub struct ScriptedGate {
    accept_all: bool,
    relevant: HashSet<String>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGate {
    pub fn relevant(texts: &[&str]) -> Self {
        Self {
            accept_all: false,
            relevant: texts.iter().map(|t| t.to_string()).collect(),
            failing: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn accept_all() -> Self {
        Self {
            accept_all: true,
            ..Self::relevant(&[])
        }
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    /// Every text the gate was asked about, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl RelevanceGate for ScriptedGate {
    async fn classify(&self, text: &str) -> Result<bool> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(text.to_string());
        }
        if self.failing.contains(text) {
            bail!("ScriptedGate: classifier error on {text:?}");
        }
        Ok(self.accept_all || self.relevant.contains(text))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<CommentRecord>>,
    fail_on_text: HashSet<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, text: &str) -> Self {
        self.fail_on_text.insert(text.to_string());
        self
    }

    pub fn records(&self) -> Vec<CommentRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn texts(&self) -> Vec<String> {
        self.records().into_iter().map(|r| r.text).collect()
    }

    pub fn find(&self, text: &str) -> Option<CommentRecord> {
        self.records().into_iter().find(|r| r.text == text)
    }
}

#[async_trait]
impl CommentSink for MemorySink {
    async fn append(&self, record: &CommentRecord) -> Result<()> {
        if self.fail_on_text.contains(&record.text) {
            bail!("MemorySink: write failed for {:?}", record.text);
        }
        let mut records = self
            .records
            .lock()
            .map_err(|_| anyhow::anyhow!("MemorySink: lock poisoned"))?;
        records.push(record.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A store that never touches a database or a timer, for paused-clock tests.
#[derive(Default)]
pub struct MemoryStore {
    seen: Mutex<HashSet<(LedgerDomain, String)>>,
    bindings: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("MemoryStore: lock poisoned".into())
}

#[async_trait]
impl Ledger for MemoryStore {
    async fn has(&self, domain: LedgerDomain, id: &str) -> harvest_store::Result<bool> {
        let seen = self.seen.lock().map_err(|_| poisoned())?;
        Ok(seen.contains(&(domain, id.to_string())))
    }

    async fn record(&self, domain: LedgerDomain, id: &str) -> harvest_store::Result<()> {
        let mut seen = self.seen.lock().map_err(|_| poisoned())?;
        seen.insert((domain, id.to_string()));
        Ok(())
    }
}

#[async_trait]
impl IdentityMap for MemoryStore {
    async fn resolve(&self, original_id: &str) -> harvest_store::Result<Option<String>> {
        let bindings = self.bindings.lock().map_err(|_| poisoned())?;
        Ok(bindings.get(original_id).cloned())
    }

    async fn bind(&self, original_id: &str, internal_id: &str) -> harvest_store::Result<()> {
        let mut bindings = self.bindings.lock().map_err(|_| poisoned())?;
        bindings.insert(original_id.to_string(), internal_id.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FailingStore
// ---------------------------------------------------------------------------

/// A store whose backing database is gone.
pub struct FailingStore;

fn unavailable() -> StoreError {
    StoreError::Unavailable("FailingStore: database unreachable".into())
}

#[async_trait]
impl Ledger for FailingStore {
    async fn has(&self, _domain: LedgerDomain, _id: &str) -> harvest_store::Result<bool> {
        Err(unavailable())
    }

    async fn record(&self, _domain: LedgerDomain, _id: &str) -> harvest_store::Result<()> {
        Err(unavailable())
    }
}

#[async_trait]
impl IdentityMap for FailingStore {
    async fn resolve(&self, _original_id: &str) -> harvest_store::Result<Option<String>> {
        Err(unavailable())
    }

    async fn bind(&self, _original_id: &str, _internal_id: &str) -> harvest_store::Result<()> {
        Err(unavailable())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Retry policy with the production attempt count and no waiting.
pub fn instant_retry() -> RetryPolicy {
    RetryPolicy::default().with_time_unit(Duration::ZERO)
}

/// A crawler over an in-memory store, a scripted gate and a memory sink,
/// with all pauses disabled.
pub struct Harness {
    pub store: SqliteStore,
    pub gate: Arc<ScriptedGate>,
    pub sink: Arc<MemorySink>,
    pub crawler: Crawler,
}

impl Harness {
    pub async fn new(gate: ScriptedGate) -> Self {
        Self::with_sink(gate, MemorySink::new()).await
    }

    pub async fn with_sink(gate: ScriptedGate, sink: MemorySink) -> Self {
        let store = SqliteStore::in_memory()
            .await
            .expect("in-memory store should open");
        Self::with_store(store, gate, sink)
    }

    /// Share an existing store, e.g. to simulate a second process run.
    pub fn with_store(store: SqliteStore, gate: ScriptedGate, sink: MemorySink) -> Self {
        let gate = Arc::new(gate);
        let sink = Arc::new(sink);
        let crawler = Crawler::new(
            Arc::new(store.clone()),
            gate.clone(),
            sink.clone(),
            instant_retry(),
            Pacing::none(),
        );
        Self {
            store,
            gate,
            sink,
            crawler,
        }
    }
}
