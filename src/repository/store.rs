//! The job store seam used by the scrape pipeline.
//!
//! The pipeline only needs five operations. `DbContext` implements them on
//! SQLite; `NullJobStore` accepts everything and keeps nothing (dry runs).

use async_trait::async_trait;
use thiserror::Error;

use super::context::DbContext;
use super::pool::DieselError;
use crate::models::{JobRecord, RunProgress, RunStatus, RunTotals, ScrapingRun};

/// Error from a job store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] DieselError),

    #[error("{0}")]
    Other(String),
}

/// Persistence operations used by a scrape run.
///
/// Run mutations return `Ok(false)` when the run is no longer `running`.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create and persist a new run in the `running` state.
    async fn create_run(&self) -> Result<ScrapingRun, StoreError>;

    async fn update_progress(&self, run_id: &str, progress: RunProgress)
        -> Result<bool, StoreError>;

    /// Mark the run `completed` with final totals.
    async fn update_completed(&self, run_id: &str, totals: RunTotals) -> Result<bool, StoreError>;

    async fn update_status(
        &self,
        run_id: &str,
        status: RunStatus,
        error_message: Option<&str>,
    ) -> Result<bool, StoreError>;

    /// Idempotent upsert of one batch. All or nothing.
    async fn upsert_jobs(&self, records: &[JobRecord]) -> Result<usize, StoreError>;
}

#[async_trait]
impl JobStore for DbContext {
    async fn create_run(&self) -> Result<ScrapingRun, StoreError> {
        let run = ScrapingRun::start();
        self.runs().create(&run).await?;
        Ok(run)
    }

    async fn update_progress(
        &self,
        run_id: &str,
        progress: RunProgress,
    ) -> Result<bool, StoreError> {
        Ok(self.runs().update_progress(run_id, progress).await?)
    }

    async fn update_completed(&self, run_id: &str, totals: RunTotals) -> Result<bool, StoreError> {
        Ok(self.runs().update_completed(run_id, totals).await?)
    }

    async fn update_status(
        &self,
        run_id: &str,
        status: RunStatus,
        error_message: Option<&str>,
    ) -> Result<bool, StoreError> {
        Ok(self
            .runs()
            .update_status(run_id, status, error_message)
            .await?)
    }

    async fn upsert_jobs(&self, records: &[JobRecord]) -> Result<usize, StoreError> {
        Ok(self.jobs().upsert_batch(records).await?)
    }
}

/// Store that persists nothing. Used for `--dry-run`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullJobStore;

#[async_trait]
impl JobStore for NullJobStore {
    async fn create_run(&self) -> Result<ScrapingRun, StoreError> {
        Ok(ScrapingRun::start())
    }

    async fn update_progress(&self, _: &str, _: RunProgress) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn update_completed(&self, _: &str, _: RunTotals) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn update_status(
        &self,
        _: &str,
        _: RunStatus,
        _: Option<&str>,
    ) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn upsert_jobs(&self, records: &[JobRecord]) -> Result<usize, StoreError> {
        Ok(records.len())
    }
}
