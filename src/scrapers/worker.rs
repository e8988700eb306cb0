//! Worker pool: parallel page fetchers with retry and backoff.
//!
//! Each page gets a brand-new engine session that is closed after the
//! attempt, so a wedged or poisoned browser never outlives one page.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::config::expand_page_url;
use super::extract::ExtractContext;
use super::types::{PageErrorKind, PageFailure, PageJob, PageResult};
use crate::browser::{BrowserEngine, FetchRequest};
use crate::models::JobRecord;

/// Hard ceiling on parallel sessions.
pub const MAX_WORKERS: usize = 8;

/// Derive the pool size from available parallelism: `clamp(floor(p * 0.6), 2, 8)`.
pub fn worker_count(parallelism: usize) -> usize {
    (parallelism * 6 / 10).clamp(2, MAX_WORKERS)
}

/// Pool size for this machine.
///
/// An explicit override is clamped to `[1, 8]` so a single worker can be
/// requested; the derived count stays within `[2, 8]`.
pub fn resolve_worker_count(explicit: Option<usize>) -> usize {
    match explicit {
        Some(n) => n.clamp(1, MAX_WORKERS),
        None => worker_count(
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        ),
    }
}

/// Delays applied by each worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerTiming {
    /// Startup delay, multiplied by the worker index.
    pub stagger: Duration,
    /// Backoff unit, multiplied by the attempt number.
    pub backoff: Duration,
    /// Pause after records render, before extraction.
    pub settle: Duration,
    /// Pause before pulling the next page.
    pub inter_page_delay: Duration,
}

impl WorkerTiming {
    /// No delays at all.
    pub const ZERO: WorkerTiming = WorkerTiming {
        stagger: Duration::ZERO,
        backoff: Duration::ZERO,
        settle: Duration::ZERO,
        inter_page_delay: Duration::ZERO,
    };
}

/// Shared, read-only state of the pool.
pub struct WorkerContext {
    pub engine: Arc<dyn BrowserEngine>,
    pub extract: ExtractContext,
    /// Listing URL template with a `{page}` placeholder.
    pub listing_url: String,
    pub record_selector: String,
    pub script: String,
    pub max_attempts: u32,
    pub page_timeout: Duration,
    pub timing: WorkerTiming,
    /// Records rejected at extraction, across all workers.
    pub dropped: AtomicU64,
}

impl WorkerContext {
    fn request(&self, page: u32) -> FetchRequest {
        FetchRequest {
            url: expand_page_url(&self.listing_url, page),
            wait_selector: self.record_selector.clone(),
            timeout: self.page_timeout,
            settle: self.timing.settle,
            script: self.script.clone(),
        }
    }

    pub fn dropped_records(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Failure of a single attempt.
type AttemptError = (PageErrorKind, String);

/// Slack over the engine's own wait before the worker gives up on a fetch.
pub const FETCH_GRACE: Duration = Duration::from_secs(5);

impl WorkerContext {
    /// Outer bound on one `fetch`: the engine's wait, the settle delay and `FETCH_GRACE`.
    fn fetch_deadline(&self) -> Duration {
        self.page_timeout + self.timing.settle + FETCH_GRACE
    }
}

fn timed_out(page: u32, what: &str, bound: Duration) -> AttemptError {
    (
        PageErrorKind::Timeout,
        format!("page {} {} exceeded {:?}", page, what, bound),
    )
}

/// One navigate-and-extract cycle in a fresh session.
///
/// Session start is bounded by the page timeout. Once a session exists it is
/// closed on every outcome, including an elapsed fetch deadline.
async fn attempt_page(ctx: &WorkerContext, page: u32) -> Result<Vec<JobRecord>, AttemptError> {
    let request = ctx.request(page);

    let mut session = match tokio::time::timeout(ctx.page_timeout, ctx.engine.open_session()).await
    {
        Ok(Ok(session)) => session,
        Ok(Err(e)) => return Err((PageErrorKind::from(&e), e.to_string())),
        Err(_) => return Err(timed_out(page, "session start", ctx.page_timeout)),
    };

    let deadline = ctx.fetch_deadline();
    let fetched = tokio::time::timeout(deadline, session.fetch(&request)).await;
    session.close().await;

    let raws = match fetched {
        Ok(Ok(raws)) => raws,
        Ok(Err(e)) => return Err((PageErrorKind::from(&e), e.to_string())),
        Err(_) => return Err(timed_out(page, "fetch", deadline)),
    };

    let (records, dropped) = ctx.extract.convert_page(raws);
    ctx.dropped.fetch_add(dropped as u64, Ordering::Relaxed);

    if records.is_empty() {
        return Err((
            PageErrorKind::Extraction,
            format!("no records extracted from page {}", page),
        ));
    }
    Ok(records)
}

/// Fetch a page, retrying the whole cycle on error or an empty result.
///
/// Attempt N failing waits `N * backoff` before the next one. Never fails:
/// exhausted retries become a `PageResult` carrying the last error.
pub async fn fetch_page(ctx: &WorkerContext, page: u32) -> PageResult {
    let max_attempts = ctx.max_attempts.max(1);
    let mut last_error: AttemptError = (PageErrorKind::Navigation, String::new());

    for attempt in 1..=max_attempts {
        match attempt_page(ctx, page).await {
            Ok(records) => {
                debug!(
                    "Page {} yielded {} records (attempt {})",
                    page,
                    records.len(),
                    attempt
                );
                return PageResult::success(page, records);
            }
            Err(err) => {
                debug!(
                    "Page {} attempt {}/{} failed: {}",
                    page, attempt, max_attempts, err.1
                );
                last_error = err;
            }
        }

        if attempt < max_attempts {
            let backoff = ctx.timing.backoff * attempt;
            if !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }
        }
    }

    let (kind, message) = last_error;
    warn!(
        "Page {} failed after {} attempt(s): {}",
        page, max_attempts, message
    );
    PageResult::failure(
        page,
        PageFailure {
            kind,
            message,
            attempts: max_attempts,
        },
    )
}

/// Spawn `count` workers draining `jobs` into `results`.
///
/// Workers exit when the job queue is empty and closed, or when the results
/// receiver is gone.
pub fn spawn_workers(
    count: usize,
    jobs: mpsc::Receiver<PageJob>,
    results: mpsc::Sender<PageResult>,
    ctx: Arc<WorkerContext>,
) -> Vec<JoinHandle<()>> {
    let jobs = Arc::new(Mutex::new(jobs));
    let mut handles = Vec::with_capacity(count);

    for worker_id in 0..count {
        let jobs = jobs.clone();
        let results = results.clone();
        let ctx = ctx.clone();

        let handle = tokio::spawn(async move {
            let stagger = ctx.timing.stagger * worker_id as u32;
            if !stagger.is_zero() {
                tokio::time::sleep(stagger).await;
            }

            loop {
                let job = {
                    let mut rx = jobs.lock().await;
                    rx.recv().await
                };

                let job = match job {
                    Some(job) => job,
                    None => break, // Queue drained and closed
                };

                let result = fetch_page(&ctx, job.page).await;
                if results.send(result).await.is_err() {
                    break; // Aggregator gone
                }

                if !ctx.timing.inter_page_delay.is_zero() {
                    tokio::time::sleep(ctx.timing.inter_page_delay).await;
                }
            }

            debug!("Worker {} finished", worker_id);
        });

        handles.push(handle);
    }

    handles
}
