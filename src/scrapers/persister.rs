//! Batch persister and run finalizer.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{info, warn};

use super::error::ScrapeError;
use super::types::ScrapeEvent;
use crate::models::{JobRecord, RunProgress, RunStatus, RunTotals};
use crate::repository::JobStore;

/// What the flush achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersistOutcome {
    pub stored: u64,
    pub failed_batches: usize,
}

/// Collapse records sharing a dedupe key, keeping the last one seen.
///
/// Order follows first appearance.
pub fn dedupe(records: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
    let mut unique: Vec<JobRecord> = Vec::with_capacity(records.len());

    for record in records {
        let key = record.dedupe_key();
        if let Some(&i) = index.get(&key) {
            unique[i] = record;
        } else {
            index.insert(key, unique.len());
            unique.push(record);
        }
    }

    unique
}

/// Upsert `records` in batches of `batch_size`. A failed batch is logged and
/// skipped; only successful batches count toward `stored`.
pub async fn persist(
    store: &dyn JobStore,
    records: &[JobRecord],
    batch_size: usize,
    events: Option<&mpsc::Sender<ScrapeEvent>>,
) -> PersistOutcome {
    let mut outcome = PersistOutcome::default();

    for (i, batch) in records.chunks(batch_size.max(1)).enumerate() {
        let batch_no = i + 1;
        match store.upsert_jobs(batch).await {
            Ok(stored) => {
                outcome.stored += stored as u64;
                if let Some(events) = events {
                    let _ = events.try_send(ScrapeEvent::BatchStored {
                        batch: batch_no,
                        stored,
                    });
                }
            }
            Err(e) => {
                let err = ScrapeError::Persistence(e.to_string());
                warn!(
                    "Batch {} ({} records) skipped: {}",
                    batch_no,
                    batch.len(),
                    err
                );
                outcome.failed_batches += 1;
                if let Some(events) = events {
                    let _ = events.try_send(ScrapeEvent::BatchFailed {
                        batch: batch_no,
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    info!(
        "Stored {} of {} records ({} failed batch(es))",
        outcome.stored,
        records.len(),
        outcome.failed_batches
    );
    outcome
}

/// Mark the run completed with its final totals.
pub async fn finalize_completed(
    store: &dyn JobStore,
    run_id: &str,
    totals: RunTotals,
) -> Result<(), ScrapeError> {
    if !store.update_completed(run_id, totals).await? {
        warn!("Run {} was no longer running at completion", run_id);
    }
    Ok(())
}

/// Record final counters, then mark the run failed with `message`.
pub async fn finalize_failed(
    store: &dyn JobStore,
    run_id: &str,
    progress: RunProgress,
    message: &str,
) -> Result<(), ScrapeError> {
    store.update_progress(run_id, progress).await?;
    if !store
        .update_status(run_id, RunStatus::Failed, Some(message))
        .await?
    {
        warn!("Run {} was no longer running when marking failed", run_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Salary, ScrapingRun, SourceFlags};
    use crate::repository::StoreError;
    use std::sync::Mutex;

    /// Store failing every batch whose first record has an id in `poison`.
    #[derive(Default)]
    struct BatchStore {
        poison: Vec<String>,
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait::async_trait]
    impl JobStore for BatchStore {
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
            let first = records[0].external_id.clone().unwrap_or_default();
            if self.poison.contains(&first) {
                return Err(StoreError::Other("constraint failed".into()));
            }
            self.batches.lock().unwrap().push(records.len());
            Ok(records.len())
        }
    }

    fn job(id: usize, title: &str) -> JobRecord {
        JobRecord {
            external_id: Some(id.to_string()),
            title: title.into(),
            employer: None,
            location_raw: None,
            city: None,
            province: None,
            salary_raw: None,
            salary: Salary::default(),
            posted_on: None,
            url: format!("https://example.com/{}", id),
            flags: SourceFlags {
                source: "test".into(),
                external_posting: false,
            },
            run_id: "run".into(),
        }
    }

    #[test]
    fn dedupe_keeps_last_and_first_position() {
        let out = dedupe(vec![job(1, "a"), job(2, "b"), job(1, "c")]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "c");
        assert_eq!(out[1].title, "b");
    }

    #[tokio::test]
    async fn batches_are_bounded() {
        let store = BatchStore::default();
        let records: Vec<_> = (0..250).map(|i| job(i, "t")).collect();

        let outcome = persist(&store, &records, 100, None).await;
        assert_eq!(outcome.stored, 250);
        assert_eq!(outcome.failed_batches, 0);
        assert_eq!(*store.batches.lock().unwrap(), vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn failed_batch_is_skipped_not_counted() {
        let store = BatchStore {
            poison: vec!["100".into()],
            ..Default::default()
        };
        let records: Vec<_> = (0..250).map(|i| job(i, "t")).collect();

        let outcome = persist(&store, &records, 100, None).await;
        assert_eq!(outcome.stored, 150);
        assert_eq!(outcome.failed_batches, 1);
    }

    #[tokio::test]
    async fn nothing_to_persist() {
        let store = BatchStore::default();
        let outcome = persist(&store, &[], 100, None).await;
        assert_eq!(outcome, PersistOutcome::default());
        assert!(store.batches.lock().unwrap().is_empty());
    }
}
