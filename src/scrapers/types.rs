//! Scrape pipeline types and events.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::browser::EngineError;
use crate::models::{JobRecord, RunStatus};

/// One unit of work: a listing page of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageJob {
    pub page: u32,
    pub run_id: Arc<str>,
}

/// Why a page produced no records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageErrorKind {
    /// Page never rendered, or the session could not be started.
    Navigation,
    /// Page rendered but yielded no usable records.
    Extraction,
    /// An attempt exceeded its time bound.
    Timeout,
}

impl From<&EngineError> for PageErrorKind {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::NavigationTimeout { .. } => Self::Timeout,
            EngineError::ScriptEvaluation(_) => Self::Extraction,
            EngineError::ElementNotFound { .. }
            | EngineError::Launch(_)
            | EngineError::Navigation(_) => Self::Navigation,
        }
    }
}

/// Final failure of a page after its attempts ran out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageFailure {
    pub kind: PageErrorKind,
    pub message: String,
    pub attempts: u32,
}

impl std::fmt::Display for PageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} after {} attempt(s): {}",
            self.kind, self.attempts, self.message
        )
    }
}

/// Outcome of one page, produced once per `PageJob`.
#[derive(Debug, Clone)]
pub struct PageResult {
    pub page: u32,
    pub outcome: Result<Vec<JobRecord>, PageFailure>,
}

impl PageResult {
    pub fn success(page: u32, records: Vec<JobRecord>) -> Self {
        Self {
            page,
            outcome: Ok(records),
        }
    }

    pub fn failure(page: u32, failure: PageFailure) -> Self {
        Self {
            page,
            outcome: Err(failure),
        }
    }

    pub fn is_error(&self) -> bool {
        self.outcome.is_err()
    }

    /// Records carried by this result, zero for failures.
    pub fn record_count(&self) -> usize {
        self.outcome.as_ref().map(Vec::len).unwrap_or(0)
    }
}

/// Events emitted while a run progresses.
#[derive(Debug, Clone)]
pub enum ScrapeEvent {
    /// Count discovered, pages about to be dispatched.
    Started {
        run_id: String,
        total_items: u64,
        total_pages: u32,
        workers: usize,
    },
    /// A page result was aggregated.
    PageCompleted {
        page: u32,
        jobs: usize,
        failed: bool,
        completed_pages: u32,
        total_pages: u32,
        jobs_scraped: u64,
    },
    /// A batch was upserted.
    BatchStored { batch: usize, stored: usize },
    /// A batch upsert failed and was skipped.
    BatchFailed { batch: usize, error: String },
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub status: RunStatus,
    pub total_items: Option<u64>,
    pub total_pages: u32,
    pub completed_pages: u32,
    pub error_count: u32,
    pub jobs_scraped: u64,
    pub jobs_stored: u64,
    /// Records rejected at extraction (missing title or URL).
    pub dropped_records: u64,
    pub failed_pages: Vec<u32>,
    pub failed_batches: usize,
    pub error_message: Option<String>,
    pub dry_run: bool,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl RunSummary {
    /// A run that failed before any page was aggregated.
    pub fn failed(run_id: &str, message: String, dry_run: bool, elapsed: Duration) -> Self {
        Self {
            run_id: run_id.to_string(),
            status: RunStatus::Failed,
            total_items: None,
            total_pages: 0,
            completed_pages: 0,
            error_count: 0,
            jobs_scraped: 0,
            jobs_stored: 0,
            dropped_records: 0,
            failed_pages: Vec::new(),
            failed_batches: 0,
            error_message: Some(message),
            dry_run,
            elapsed,
        }
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn engine_errors_map_to_page_kinds() {
        let timeout = EngineError::NavigationTimeout {
            url: "u".into(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(PageErrorKind::from(&timeout), PageErrorKind::Timeout);
        assert_eq!(
            PageErrorKind::from(&EngineError::ScriptEvaluation("x".into())),
            PageErrorKind::Extraction
        );
        assert_eq!(
            PageErrorKind::from(&EngineError::Launch("x".into())),
            PageErrorKind::Navigation
        );
    }

    #[test]
    fn failures_carry_no_records() {
        let result = PageResult::failure(
            3,
            PageFailure {
                kind: PageErrorKind::Navigation,
                message: "unreachable".into(),
                attempts: 2,
            },
        );
        assert!(result.is_error());
        assert_eq!(result.record_count(), 0);
    }
}
