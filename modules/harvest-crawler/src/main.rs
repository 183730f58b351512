use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use harvest_common::{Config, SourcesFile};
use harvest_crawler::sink::JsonlSink;
use harvest_crawler::{gate, run_cycle, CommentSource, Crawler, CycleStats, Pacing, RetryPolicy};
use harvest_sources::{RedditClient, YouTubeClient};
use harvest_store::SqliteStore;

#[derive(Parser)]
#[command(name = "harvest-crawler", about = "Incremental Reddit and YouTube comment harvester")]
struct Cli {
    /// Run a single crawl cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("harvest=info".parse()?))
        .init();

    let cli = Cli::parse();
    info!("Comment harvester starting...");

    let config = Config::from_env()?;
    let store = SqliteStore::open(&config.database_url)
        .await
        .with_context(|| format!("Failed to open crawl store at {}", config.database_url))?;

    let outcome = run(&cli, &config, &store).await;

    store.close().await;
    info!("Crawl store closed");
    outcome
}

async fn run(cli: &Cli, config: &Config, store: &SqliteStore) -> Result<()> {
    let sources = build_sources(config)?;
    let gate = gate::from_config(config)?;
    let sink = Arc::new(JsonlSink::new(&config.comments_path));
    let crawler = Crawler::new(
        Arc::new(store.clone()),
        gate,
        sink,
        RetryPolicy::default().with_time_unit(config.retry_time_unit),
        Pacing {
            comment_pause: config.comment_pause,
            unit_pause: config.unit_pause,
        },
    );

    let (shutdown_tx, mut shutdown) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    loop {
        let wait = match crawl_once(&crawler, &sources, config).await {
            Ok(stats) => {
                info!("{stats}");
                config.cycle_interval
            }
            Err(e) if cli.once => return Err(e),
            Err(e) => {
                error!(error = %e, "Crawl cycle failed");
                config.failure_backoff
            }
        };

        if cli.once {
            return Ok(());
        }
        if *shutdown.borrow() {
            info!("Interrupted, stopping after cycle");
            return Ok(());
        }

        info!(secs = wait.as_secs(), "Sleeping until next cycle");
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            Ok(()) = shutdown.changed() => {
                info!("Interrupted, stopping");
                return Ok(());
            }
        }
    }
}

/// The sources file is re-read every cycle so edits apply without a restart.
async fn crawl_once(
    crawler: &Crawler,
    sources: &[Arc<dyn CommentSource>],
    config: &Config,
) -> Result<CycleStats> {
    let file = SourcesFile::load(&config.sources_path)?;
    Ok(run_cycle(crawler, sources, &file).await?)
}

fn build_sources(config: &Config) -> Result<Vec<Arc<dyn CommentSource>>> {
    let reddit = RedditClient::new(
        &config.reddit_base_url,
        &config.reddit_user_agent,
        config.reddit_listing_limit,
    )?;
    let mut sources: Vec<Arc<dyn CommentSource>> = vec![Arc::new(reddit)];

    match &config.youtube_api_key {
        Some(key) => sources.push(Arc::new(YouTubeClient::new(key, config.youtube_max_pages)?)),
        None => warn!("YOUTUBE_API_KEY not set, YouTube source unavailable"),
    }
    Ok(sources)
}
