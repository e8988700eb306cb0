//! Diesel-based scraping run repository.
//!
//! Every mutation is guarded by `status = 'running'`. Once a run reaches a
//! terminal state, later writes match zero rows and report `false`.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use super::diesel_models::{NewRun, RunRecord};
use super::pool::{AsyncSqlitePool, DieselError};
use super::util::{from_db_count, to_db_count};
use super::{parse_datetime, parse_datetime_opt};
use crate::models::{RunProgress, RunStatus, RunTotals, ScrapingRun};
use crate::schema::scraping_runs;

/// Convert a database record to a domain model.
impl From<RunRecord> for ScrapingRun {
    fn from(record: RunRecord) -> Self {
        ScrapingRun {
            id: record.id,
            status: RunStatus::from_str(&record.status).unwrap_or(RunStatus::Failed),
            started_at: parse_datetime(&record.started_at),
            completed_at: parse_datetime_opt(record.completed_at),
            total_pages: from_db_count(record.total_pages),
            jobs_scraped: from_db_count(record.jobs_scraped),
            jobs_stored: from_db_count(record.jobs_stored),
            last_page_scraped: from_db_count(record.last_page_scraped),
            error_message: record.error_message,
        }
    }
}

const RUNNING: &str = "running";

/// Diesel-based run repository.
#[derive(Clone)]
pub struct DieselRunRepository {
    pool: AsyncSqlitePool,
}

impl DieselRunRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new run.
    pub async fn create(&self, run: &ScrapingRun) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let started_at = run.started_at.to_rfc3339();
        let completed_at = run.completed_at.map(|dt| dt.to_rfc3339());

        diesel::insert_into(scraping_runs::table)
            .values(NewRun {
                id: &run.id,
                status: run.status.as_str(),
                started_at: &started_at,
                completed_at: completed_at.as_deref(),
                total_pages: to_db_count(run.total_pages),
                jobs_scraped: to_db_count(run.jobs_scraped),
                jobs_stored: to_db_count(run.jobs_stored),
                last_page_scraped: to_db_count(run.last_page_scraped),
                error_message: run.error_message.as_deref(),
            })
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Get a run by ID.
    pub async fn get(&self, id: &str) -> Result<Option<ScrapingRun>, DieselError> {
        let mut conn = self.pool.get().await?;

        scraping_runs::table
            .find(id)
            .first::<RunRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(ScrapingRun::from))
    }

    /// Most recently started runs first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<ScrapingRun>, DieselError> {
        let mut conn = self.pool.get().await?;

        scraping_runs::table
            .order(scraping_runs::started_at.desc())
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .load::<RunRecord>(&mut conn)
            .await
            .map(|records| records.into_iter().map(ScrapingRun::from).collect())
    }

    /// Write a progress snapshot.
    pub async fn update_progress(
        &self,
        id: &str,
        progress: RunProgress,
    ) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        let rows = diesel::update(
            scraping_runs::table
                .filter(scraping_runs::id.eq(id))
                .filter(scraping_runs::status.eq(RUNNING)),
        )
        .set((
            scraping_runs::total_pages.eq(to_db_count(progress.total_pages)),
            scraping_runs::jobs_scraped.eq(to_db_count(progress.jobs_scraped)),
            scraping_runs::jobs_stored.eq(to_db_count(progress.jobs_stored)),
            scraping_runs::last_page_scraped.eq(to_db_count(progress.last_page)),
        ))
        .execute(&mut conn)
        .await?;

        if rows == 0 {
            debug!("Progress for run {} ignored: not running", id);
        }
        Ok(rows > 0)
    }

    /// Mark a run completed with its final totals.
    pub async fn update_completed(&self, id: &str, totals: RunTotals) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;
        let now = Utc::now().to_rfc3339();

        let rows = diesel::update(
            scraping_runs::table
                .filter(scraping_runs::id.eq(id))
                .filter(scraping_runs::status.eq(RUNNING)),
        )
        .set((
            scraping_runs::status.eq(RunStatus::Completed.as_str()),
            scraping_runs::completed_at.eq(Some(&now)),
            scraping_runs::total_pages.eq(to_db_count(totals.total_pages)),
            scraping_runs::jobs_scraped.eq(to_db_count(totals.jobs_scraped)),
            scraping_runs::jobs_stored.eq(to_db_count(totals.jobs_stored)),
        ))
        .execute(&mut conn)
        .await?;

        if rows == 0 {
            debug!("Completion for run {} ignored: not running", id);
        }
        Ok(rows > 0)
    }

    /// Move a run to `status`, recording an optional error message.
    ///
    /// Terminal statuses also stamp `completed_at`.
    pub async fn update_status(
        &self,
        id: &str,
        status: RunStatus,
        error_message: Option<&str>,
    ) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;
        let completed_at = status.is_terminal().then(|| Utc::now().to_rfc3339());

        let rows = diesel::update(
            scraping_runs::table
                .filter(scraping_runs::id.eq(id))
                .filter(scraping_runs::status.eq(RUNNING)),
        )
        .set((
            scraping_runs::status.eq(status.as_str()),
            scraping_runs::completed_at.eq(completed_at),
            scraping_runs::error_message.eq(error_message),
        ))
        .execute(&mut conn)
        .await?;

        if rows == 0 {
            debug!("Status {} for run {} ignored: not running", status, id);
        }
        Ok(rows > 0)
    }
}
