//! Concurrent paginated-listing scraper.
//!
//! A run flows through:
//! - `prober`: read the total count, derive the page count
//! - `dispatcher`: queue one `PageJob` per page
//! - `worker`: N workers, a fresh engine session per page, retry with backoff
//! - `aggregator`: single consumer of results, progress snapshots
//! - `persister`: batched upserts and run finalization
//!
//! `ScrapeOrchestrator` wires them together for one run.

pub mod aggregator;
pub mod config;
pub mod dispatcher;
mod error;
pub mod extract;
mod orchestrator;
pub mod persister;
pub mod prober;
mod types;
pub mod worker;

pub use config::{ScraperConfig, TimingConfig};
pub use error::ScrapeError;
pub use extract::{ExtractContext, DEFAULT_EXTRACTION_SCRIPT};
pub use orchestrator::ScrapeOrchestrator;
pub use types::{PageErrorKind, PageFailure, PageJob, PageResult, RunSummary, ScrapeEvent};
pub use worker::{resolve_worker_count, worker_count, WorkerTiming};
