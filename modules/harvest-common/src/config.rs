use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{HarvestError, Result};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (comment-harvest)";

/// Application configuration loaded from environment variables.
/// The list of things to crawl lives in the JSON sources file instead,
/// which is re-read every cycle.
#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_url: String,
    pub comments_path: PathBuf,
    pub sources_path: PathBuf,

    // Scheduling
    pub cycle_interval: Duration,
    pub failure_backoff: Duration,
    pub comment_pause: Duration,
    pub unit_pause: Duration,
    pub retry_time_unit: Duration,

    // Reddit
    pub reddit_base_url: String,
    pub reddit_user_agent: String,
    pub reddit_listing_limit: u32,

    // YouTube
    pub youtube_api_key: Option<String>,
    pub youtube_max_pages: u32,

    // Relevance
    pub classifier_url: Option<String>,
    pub relevance_keywords: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: env_or("DATABASE_URL", "sqlite://crawler.db"),
            comments_path: PathBuf::from(env_or("COMMENTS_PATH", "comments.jsonl")),
            sources_path: PathBuf::from(env_or("SOURCES_PATH", "sample.json")),
            cycle_interval: Duration::from_secs(parse_env("CYCLE_INTERVAL_SECS", 300)?),
            failure_backoff: Duration::from_secs(parse_env("FAILURE_BACKOFF_SECS", 300)?),
            comment_pause: Duration::from_millis(parse_env("COMMENT_PAUSE_MS", 1000)?),
            unit_pause: Duration::from_millis(parse_env("UNIT_PAUSE_MS", 2000)?),
            retry_time_unit: Duration::from_millis(parse_env("RETRY_TIME_UNIT_MS", 1000)?),
            reddit_base_url: env_or("REDDIT_BASE_URL", "https://old.reddit.com")
                .trim_end_matches('/')
                .to_string(),
            reddit_user_agent: env_or("REDDIT_USER_AGENT", DEFAULT_USER_AGENT),
            reddit_listing_limit: parse_env("REDDIT_LISTING_LIMIT", 25)?,
            youtube_api_key: optional_env("YOUTUBE_API_KEY"),
            youtube_max_pages: parse_env("YOUTUBE_MAX_PAGES", 100)?,
            classifier_url: optional_env("CLASSIFIER_URL"),
            relevance_keywords: split_list(&std::env::var("RELEVANCE_KEYWORDS").unwrap_or_default()),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  DATABASE_URL: {}", self.database_url);
        tracing::info!("  SOURCES_PATH: {}", self.sources_path.display());
        tracing::info!("  COMMENTS_PATH: {}", self.comments_path.display());
        tracing::info!("  YOUTUBE_API_KEY: {}", preview_opt(&self.youtube_api_key));
        tracing::info!("  CLASSIFIER_URL: {}", preview_opt(&self.classifier_url));
        tracing::info!("  RELEVANCE_KEYWORDS: {} terms", self.relevance_keywords.len());
    }
}

/// First five characters and the length, never the whole secret.
fn preview(val: &str) -> String {
    let head: String = val.chars().take(5).collect();
    format!("{}...({} chars)", head, val.chars().count())
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T> {
    match optional_env(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| HarvestError::Config(format!("{key} must be a non-negative integer, got {raw:?}"))),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
