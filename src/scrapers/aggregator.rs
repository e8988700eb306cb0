//! Result aggregator: the single consumer of worker results.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use super::types::{PageResult, ScrapeEvent};
use crate::models::{JobRecord, RunProgress};
use crate::repository::JobStore;

/// Running totals of a drain.
pub struct Aggregator {
    run_id: String,
    store: Arc<dyn JobStore>,
    events: Option<mpsc::Sender<ScrapeEvent>>,
    progress_interval: u32,
    total_pages: u32,
    completed_pages: u32,
    error_count: u32,
    jobs_scraped: u64,
    records: Vec<JobRecord>,
    failed_pages: Vec<u32>,
}

impl Aggregator {
    pub fn new(
        run_id: &str,
        total_pages: u32,
        store: Arc<dyn JobStore>,
        progress_interval: u32,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            store,
            events: None,
            progress_interval,
            total_pages,
            completed_pages: 0,
            error_count: 0,
            jobs_scraped: 0,
            records: Vec::new(),
            failed_pages: Vec::new(),
        }
    }

    /// Also report each page on `events`.
    pub fn with_events(mut self, events: Option<mpsc::Sender<ScrapeEvent>>) -> Self {
        self.events = events;
        self
    }

    pub fn completed_pages(&self) -> u32 {
        self.completed_pages
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn jobs_scraped(&self) -> u64 {
        self.jobs_scraped
    }

    /// Failed page numbers in ascending order.
    pub fn failed_pages(&self) -> Vec<u32> {
        let mut pages = self.failed_pages.clone();
        pages.sort_unstable();
        pages
    }

    /// Hand over the buffered records.
    pub fn take_records(&mut self) -> Vec<JobRecord> {
        std::mem::take(&mut self.records)
    }

    /// Fold one result into the counters. Returns true when a snapshot is due.
    fn record(&mut self, result: PageResult) -> bool {
        self.completed_pages += 1;

        let jobs = result.record_count();
        let failed = result.is_error();
        match result.outcome {
            Ok(records) => {
                self.jobs_scraped += records.len() as u64;
                self.records.extend(records);
            }
            Err(_) => {
                self.error_count += 1;
                self.failed_pages.push(result.page);
            }
        }

        info!(
            "Page {} done: {} jobs{} ({}/{} pages, {} jobs so far)",
            result.page,
            jobs,
            if failed { " [failed]" } else { "" },
            self.completed_pages,
            self.total_pages,
            self.jobs_scraped
        );

        if let Some(ref events) = self.events {
            // Never stall the drain on a slow listener
            let _ = events.try_send(ScrapeEvent::PageCompleted {
                page: result.page,
                jobs,
                failed,
                completed_pages: self.completed_pages,
                total_pages: self.total_pages,
                jobs_scraped: self.jobs_scraped,
            });
        }

        self.progress_interval > 0 && self.completed_pages % self.progress_interval == 0
    }

    /// Fold one result in, writing a progress snapshot when one is due.
    pub async fn apply(&mut self, result: PageResult) {
        if self.record(result) {
            self.snapshot().await;
        }
    }

    /// Persist the current counters on the run. Failures are logged only.
    async fn snapshot(&self) {
        let progress = RunProgress {
            total_pages: self.total_pages,
            jobs_scraped: u32::try_from(self.jobs_scraped).unwrap_or(u32::MAX),
            jobs_stored: 0,
            last_page: self.completed_pages,
        };
        if let Err(e) = self.store.update_progress(&self.run_id, progress).await {
            warn!("Failed to write progress for run {}: {}", self.run_id, e);
        }
    }

    /// Drain until every sender is gone.
    pub async fn drain(&mut self, results: &mut mpsc::Receiver<PageResult>) {
        while let Some(result) = results.recv().await {
            self.apply(result).await;
        }
    }

    /// Close the queue and fold in whatever is already buffered.
    pub async fn drain_remaining(&mut self, results: &mut mpsc::Receiver<PageResult>) {
        results.close();
        while let Ok(result) = results.try_recv() {
            self.apply(result).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RunStatus, RunTotals, Salary, ScrapingRun, SourceFlags};
    use crate::repository::StoreError;
    use crate::scrapers::types::{PageErrorKind, PageFailure};
    use std::sync::Mutex;

    /// Store that records progress snapshots and can be told to fail them.
    #[derive(Default)]
    struct RecordingStore {
        snapshots: Mutex<Vec<RunProgress>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl JobStore for RecordingStore {
        async fn create_run(&self) -> Result<ScrapingRun, StoreError> {
            Ok(ScrapingRun::start())
        }
        async fn update_progress(&self, _: &str, p: RunProgress) -> Result<bool, StoreError> {
            if self.fail {
                return Err(StoreError::Other("disk full".into()));
            }
            self.snapshots.lock().unwrap().push(p);
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

    fn records(page: u32, n: usize) -> Vec<JobRecord> {
        (0..n)
            .map(|i| JobRecord {
                external_id: Some(format!("{}-{}", page, i)),
                title: "Cook".into(),
                employer: None,
                location_raw: None,
                city: None,
                province: None,
                salary_raw: None,
                salary: Salary::default(),
                posted_on: None,
                url: format!("https://example.com/{}/{}", page, i),
                flags: SourceFlags {
                    source: "test".into(),
                    external_posting: false,
                },
                run_id: "run".into(),
            })
            .collect()
    }

    fn failed(page: u32) -> PageResult {
        PageResult::failure(
            page,
            PageFailure {
                kind: PageErrorKind::Navigation,
                message: "unreachable".into(),
                attempts: 2,
            },
        )
    }

    #[tokio::test]
    async fn counts_results_in_any_order() {
        let store = Arc::new(RecordingStore::default());
        let mut agg = Aggregator::new("run", 5, store, 10);

        agg.apply(PageResult::success(5, records(5, 23))).await;
        agg.apply(failed(3)).await;
        agg.apply(PageResult::success(1, records(1, 25))).await;
        agg.apply(PageResult::success(4, records(4, 25))).await;
        agg.apply(PageResult::success(2, records(2, 25))).await;

        assert_eq!(agg.completed_pages(), 5);
        assert_eq!(agg.error_count(), 1);
        assert_eq!(agg.jobs_scraped(), 98);
        assert_eq!(agg.failed_pages(), vec![3]);
        assert_eq!(agg.take_records().len(), 98);
    }

    #[tokio::test]
    async fn snapshots_every_interval() {
        let store = Arc::new(RecordingStore::default());
        let mut agg = Aggregator::new("run", 25, store.clone(), 10);

        for page in 1..=25 {
            agg.apply(PageResult::success(page, records(page, 2))).await;
        }

        let snapshots = store.snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].last_page, 10);
        assert_eq!(snapshots[0].jobs_scraped, 20);
        assert_eq!(snapshots[0].jobs_stored, 0);
        assert_eq!(snapshots[1].last_page, 20);
        assert_eq!(snapshots[1].total_pages, 25);
    }

    #[tokio::test]
    async fn failed_snapshot_does_not_stop_the_drain() {
        let store = Arc::new(RecordingStore {
            fail: true,
            ..Default::default()
        });
        let (tx, mut rx) = mpsc::channel(16);
        for page in 1..=12 {
            tx.send(PageResult::success(page, records(page, 1))).await.unwrap();
        }
        drop(tx);

        let mut agg = Aggregator::new("run", 12, store, 10);
        agg.drain(&mut rx).await;
        assert_eq!(agg.completed_pages(), 12);
        assert_eq!(agg.jobs_scraped(), 12);
    }

    #[tokio::test]
    async fn events_are_emitted_per_page() {
        let store = Arc::new(RecordingStore::default());
        let (events_tx, mut events_rx) = mpsc::channel(8);
        let mut agg = Aggregator::new("run", 2, store, 10).with_events(Some(events_tx));

        agg.apply(failed(2)).await;
        match events_rx.recv().await {
            Some(ScrapeEvent::PageCompleted {
                page,
                failed,
                completed_pages,
                ..
            }) => {
                assert_eq!(page, 2);
                assert!(failed);
                assert_eq!(completed_pages, 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
