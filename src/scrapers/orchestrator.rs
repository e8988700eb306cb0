//! Scrape orchestrator: probe, dispatch, fan out, aggregate, persist, finalize.
//!
//! One `ScrapeOrchestrator` drives one run. The pipeline runs in its own task
//! so that a panic anywhere inside it still ends with the run marked failed.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::{error, info, warn};

use super::aggregator::Aggregator;
use super::config::ScraperConfig;
use super::error::ScrapeError;
use super::extract::ExtractContext;
use super::types::{RunSummary, ScrapeEvent};
use super::worker::{resolve_worker_count, spawn_workers, WorkerContext};
use super::{dispatcher, persister, prober};
use crate::browser::BrowserEngine;
use crate::models::{RunProgress, RunStatus, RunTotals};
use crate::repository::{JobStore, NullJobStore};

/// Drives a single scrape run against an engine and a store.
pub struct ScrapeOrchestrator {
    engine: Arc<dyn BrowserEngine>,
    store: Arc<dyn JobStore>,
    config: ScraperConfig,
    workers: usize,
    events: Option<mpsc::Sender<ScrapeEvent>>,
    dry_run: bool,
}

impl ScrapeOrchestrator {
    pub fn new(
        engine: Arc<dyn BrowserEngine>,
        store: Arc<dyn JobStore>,
        config: ScraperConfig,
    ) -> Self {
        let workers = resolve_worker_count(config.workers);
        Self {
            engine,
            store,
            config,
            workers,
            events: None,
            dry_run: false,
        }
    }

    /// Override the pool size.
    ///
    /// An explicit count is clamped to `[1, 8]`; the floor of 2 only applies to
    /// the count derived from available parallelism. Either way the pool never
    /// exceeds the number of pages in the run.
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        if workers.is_some() {
            self.workers = resolve_worker_count(workers);
        }
        self
    }

    /// Report progress on `events`.
    pub fn with_events(mut self, events: mpsc::Sender<ScrapeEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Scrape without touching the database.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        if dry_run {
            self.store = Arc::new(NullJobStore);
        }
        self.dry_run = dry_run;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run the whole pipeline.
    ///
    /// Only failing to create the run record is returned as an error. Anything
    /// that goes wrong afterwards, panics included, marks the run failed and
    /// comes back as a failed `RunSummary`.
    pub async fn run(&self) -> Result<RunSummary, ScrapeError> {
        let started = Instant::now();
        let run = self.store.create_run().await?;
        info!(
            "Starting run {} with {} worker(s){}",
            run.id,
            self.workers,
            if self.dry_run { " (dry run)" } else { "" }
        );

        let pipeline = Pipeline {
            engine: self.engine.clone(),
            store: self.store.clone(),
            config: self.config.clone(),
            workers: self.workers,
            events: self.events.clone(),
            dry_run: self.dry_run,
            run_id: run.id.clone(),
            started,
        };

        let fault = match tokio::spawn(pipeline.execute()).await {
            Ok(Ok(summary)) => return Ok(summary),
            Ok(Err(e)) => e,
            Err(join_err) => ScrapeError::Unexpected(describe_join_error(join_err)),
        };

        let message = fault.to_string();
        error!("Run {} failed: {}", run.id, message);
        if let Err(e) = self
            .store
            .update_status(&run.id, RunStatus::Failed, Some(&message))
            .await
        {
            error!("Could not mark run {} failed: {}", run.id, e);
        }

        Ok(RunSummary::failed(
            &run.id,
            message,
            self.dry_run,
            started.elapsed(),
        ))
    }
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        format!("panic: {}", detail)
    } else {
        "task cancelled".to_string()
    }
}

/// Owned state of one pipeline execution.
struct Pipeline {
    engine: Arc<dyn BrowserEngine>,
    store: Arc<dyn JobStore>,
    config: ScraperConfig,
    workers: usize,
    events: Option<mpsc::Sender<ScrapeEvent>>,
    dry_run: bool,
    run_id: String,
    started: Instant,
}

impl Pipeline {
    fn emit(&self, event: ScrapeEvent) {
        if let Some(ref events) = self.events {
            let _ = events.try_send(event);
        }
    }

    async fn execute(self) -> Result<RunSummary, ScrapeError> {
        let probe = prober::probe(self.engine.as_ref(), &self.config).await?;
        let total_pages = probe.total_pages;
        let workers = self
            .workers
            .min(usize::try_from(total_pages).unwrap_or(usize::MAX))
            .max(1);

        self.emit(ScrapeEvent::Started {
            run_id: self.run_id.clone(),
            total_items: probe.total_items,
            total_pages,
            workers,
        });

        let jobs = dispatcher::dispatch(total_pages, &self.run_id)?;

        let ctx = Arc::new(WorkerContext {
            engine: self.engine.clone(),
            extract: ExtractContext {
                run_id: self.run_id.clone(),
                source: self.config.source.clone(),
                listing_url: self.config.page_url(1),
                listing_host: self.config.listing_host(),
            },
            listing_url: self.config.listing_url.clone(),
            record_selector: self.config.record_selector.clone(),
            script: self.config.script().to_string(),
            max_attempts: self.config.max_attempts,
            page_timeout: self.config.page_timeout(),
            timing: self.config.worker_timing(),
            dropped: AtomicU64::new(0),
        });

        let (results_tx, mut results_rx) = mpsc::channel(2 * workers);
        let handles = spawn_workers(workers, jobs, results_tx.clone(), ctx.clone());
        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        // Supervisor: join every worker, then close the results queue
        let supervisor = tokio::spawn(async move {
            let mut panics = Vec::new();
            for handle in handles {
                if let Err(e) = handle.await {
                    if e.is_panic() {
                        panics.push(describe_join_error(e));
                    }
                }
            }
            drop(results_tx);
            panics
        });

        let mut aggregator = Aggregator::new(
            &self.run_id,
            total_pages,
            self.store.clone(),
            self.config.progress_interval,
        )
        .with_events(self.events.clone());

        let deadline = self.config.run_timeout();
        let timed_out = tokio::time::timeout(deadline, aggregator.drain(&mut results_rx))
            .await
            .is_err();

        let mut fault: Option<String> = None;
        if timed_out {
            supervisor.abort();
            for abort in &aborts {
                abort.abort();
            }
            aggregator.drain_remaining(&mut results_rx).await;
            let message = deadline_message(deadline, aggregator.completed_pages(), total_pages);
            warn!("Run {}: {}", self.run_id, message);
            fault = Some(message);
        } else {
            match supervisor.await {
                Ok(panics) if !panics.is_empty() => {
                    fault = Some(
                        ScrapeError::Unexpected(format!("worker {}", panics.join("; "))).to_string(),
                    );
                }
                Ok(_) => {}
                Err(e) => fault = Some(ScrapeError::Unexpected(describe_join_error(e)).to_string()),
            }
        }

        let records = persister::dedupe(aggregator.take_records());
        let persisted = persister::persist(
            self.store.as_ref(),
            &records,
            self.config.batch_size,
            self.events.as_ref(),
        )
        .await;

        let jobs_scraped = u32::try_from(aggregator.jobs_scraped()).unwrap_or(u32::MAX);
        let jobs_stored = u32::try_from(persisted.stored).unwrap_or(u32::MAX);

        let status = match fault {
            Some(ref message) => {
                let progress = RunProgress {
                    total_pages,
                    jobs_scraped,
                    jobs_stored,
                    last_page: aggregator.completed_pages(),
                };
                persister::finalize_failed(self.store.as_ref(), &self.run_id, progress, message)
                    .await?;
                RunStatus::Failed
            }
            None => {
                let totals = RunTotals {
                    total_pages,
                    jobs_scraped,
                    jobs_stored,
                };
                persister::finalize_completed(self.store.as_ref(), &self.run_id, totals).await?;
                RunStatus::Completed
            }
        };

        let summary = RunSummary {
            run_id: self.run_id.clone(),
            status,
            total_items: Some(probe.total_items),
            total_pages,
            completed_pages: aggregator.completed_pages(),
            error_count: aggregator.error_count(),
            jobs_scraped: aggregator.jobs_scraped(),
            jobs_stored: persisted.stored,
            dropped_records: ctx.dropped_records(),
            failed_pages: aggregator.failed_pages(),
            failed_batches: persisted.failed_batches,
            error_message: fault,
            dry_run: self.dry_run,
            elapsed: self.started.elapsed(),
        };

        info!(
            "Run {} {}: {}/{} pages, {} scraped, {} stored, {} page error(s)",
            summary.run_id,
            summary.status,
            summary.completed_pages,
            summary.total_pages,
            summary.jobs_scraped,
            summary.jobs_stored,
            summary.error_count
        );

        Ok(summary)
    }
}

fn deadline_message(deadline: Duration, completed: u32, total: u32) -> String {
    format!(
        "run deadline of {}s exceeded after {}/{} pages",
        deadline.as_secs(),
        completed,
        total
    )
}
