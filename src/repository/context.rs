//! Database context for managing connections and repository access.
//!
//! The DbContext is the primary entry point for all database operations.
//! It holds the connection pool and provides access to the repositories.

use std::path::Path;

use diesel_async::SimpleAsyncConnection;

use super::diesel_job::DieselJobRepository;
use super::diesel_run::DieselRunRepository;
use super::pool::{AsyncSqlitePool, DieselError};
use crate::models::{ScrapingRun, StoredJob};

/// Database context that manages the connection pool and provides repository access.
///
/// # Example
/// ```ignore
/// let ctx = DbContext::new(&db_path);
/// ctx.init_schema().await?;
/// let runs = ctx.recent_runs(10).await?;
/// ```
#[derive(Clone)]
pub struct DbContext {
    pool: AsyncSqlitePool,
}

impl DbContext {
    /// Create a context from a database file path.
    pub fn new(db_path: &Path) -> Self {
        Self {
            pool: AsyncSqlitePool::from_path(db_path),
        }
    }

    /// Create a context from a database URL (`sqlite:` prefix optional).
    pub fn from_url(url: &str) -> Self {
        Self {
            pool: AsyncSqlitePool::new(url),
        }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &AsyncSqlitePool {
        &self.pool
    }

    /// Get a run repository.
    pub fn runs(&self) -> DieselRunRepository {
        DieselRunRepository::new(self.pool.clone())
    }

    /// Get a job repository.
    pub fn jobs(&self) -> DieselJobRepository {
        DieselJobRepository::new(self.pool.clone())
    }

    /// Create tables and indexes if they don't exist.
    pub async fn init_schema(&self) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;
        conn.batch_execute(
            r#"
            PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS scraping_runs (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL DEFAULT 'running',
                started_at TEXT NOT NULL,
                completed_at TEXT,
                total_pages INTEGER NOT NULL DEFAULT 0,
                jobs_scraped INTEGER NOT NULL DEFAULT 0,
                jobs_stored INTEGER NOT NULL DEFAULT 0,
                last_page_scraped INTEGER NOT NULL DEFAULT 0,
                error_message TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_scraping_runs_started_at
                ON scraping_runs(started_at);

            CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dedupe_key TEXT NOT NULL,
                external_id TEXT,
                title TEXT NOT NULL,
                employer TEXT,
                location_raw TEXT,
                city TEXT,
                province TEXT,
                salary_raw TEXT,
                salary_min REAL,
                salary_max REAL,
                salary_type TEXT NOT NULL DEFAULT 'unknown',
                posted_on TEXT,
                url TEXT NOT NULL,
                source TEXT NOT NULL,
                external_posting INTEGER NOT NULL DEFAULT 0,
                run_id TEXT NOT NULL,
                first_seen_run_id TEXT NOT NULL,
                first_seen_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_dedupe_key ON jobs(dedupe_key);
            CREATE INDEX IF NOT EXISTS idx_jobs_run_id ON jobs(run_id);
            CREATE INDEX IF NOT EXISTS idx_jobs_province ON jobs(province);
            "#,
        )
        .await
    }

    /// Most recent runs first.
    pub async fn recent_runs(&self, limit: usize) -> Result<Vec<ScrapingRun>, DieselError> {
        self.runs().recent(limit).await
    }

    /// Look up a run by id.
    pub async fn get_run(&self, id: &str) -> Result<Option<ScrapingRun>, DieselError> {
        self.runs().get(id).await
    }

    /// Total stored listings.
    pub async fn count_jobs(&self) -> Result<u64, DieselError> {
        self.jobs().count().await
    }

    /// Most recently updated listings first.
    pub async fn recent_jobs(&self, limit: usize) -> Result<Vec<StoredJob>, DieselError> {
        self.jobs().recent(limit).await
    }
}
