//! Scrape run errors.

use thiserror::Error;

use crate::browser::EngineError;
use crate::repository::StoreError;

/// Errors surfaced by the scrape pipeline.
///
/// Page-level problems never show up here; they travel as `PageFailure`
/// inside `PageResult`. What remains is fatal to the run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The listing never rendered what the probe waited for.
    #[error("navigation failed: {0}")]
    Navigation(#[from] EngineError),

    /// A page rendered but yielded nothing usable.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The total result count could not be read.
    #[error("could not parse total count from {text:?}")]
    Parse { text: String },

    /// A batch upsert failed.
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// Anything else: broken invariants, panics, aborted tasks.
    #[error("unexpected fault: {0}")]
    Unexpected(String),

    /// The job store rejected a run operation.
    #[error("job store error: {0}")]
    Store(#[from] StoreError),
}
