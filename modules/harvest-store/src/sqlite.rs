// SQLite persistence for the ledger and identity map.
//
// Every operation is a single statement, so operations on the same key are
// atomic with respect to each other regardless of pool size.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::Result;
use crate::traits::{IdentityMap, Ledger, LedgerDomain};

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap an existing pool. Does not run migrations.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `url` and apply migrations.
    pub async fn open(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        info!(url, "Crawl store opened");
        Ok(store)
    }

    /// Private in-memory database. A single connection, since every
    /// `:memory:` connection is its own database, kept open for the pool's life.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn table(domain: LedgerDomain) -> &'static str {
    match domain {
        LedgerDomain::Units => "seen_units",
        LedgerDomain::Comments => "seen_comments",
    }
}

#[async_trait]
impl Ledger for SqliteStore {
    async fn has(&self, domain: LedgerDomain, id: &str) -> Result<bool> {
        let sql = format!("SELECT 1 FROM {} WHERE id = ?1", table(domain));
        let row = sqlx::query_scalar::<_, i64>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn record(&self, domain: LedgerDomain, id: &str) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (id) VALUES (?1) ON CONFLICT (id) DO NOTHING",
            table(domain)
        );
        sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityMap for SqliteStore {
    async fn resolve(&self, original_id: &str) -> Result<Option<String>> {
        let internal = sqlx::query_scalar::<_, String>(
            "SELECT internal_id FROM comment_identity WHERE original_id = ?1",
        )
        .bind(original_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(internal)
    }

    async fn bind(&self, original_id: &str, internal_id: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO comment_identity (original_id, internal_id)
            VALUES (?1, ?2)
            ON CONFLICT (original_id) DO UPDATE SET
                internal_id = excluded.internal_id,
                bound_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            "#,
        )
        .bind(original_id)
        .bind(internal_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
