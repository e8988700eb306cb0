//! Work dispatcher: one `PageJob` per page, queued up front.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::error::ScrapeError;
use super::types::PageJob;

/// Fill a queue sized to hold every page and close its sending side.
///
/// Never waits: capacity equals the page count, so a full queue means a
/// broken invariant.
pub fn dispatch(total_pages: u32, run_id: &str) -> Result<mpsc::Receiver<PageJob>, ScrapeError> {
    let capacity = usize::try_from(total_pages).unwrap_or(usize::MAX).max(1);
    let (tx, rx) = mpsc::channel(capacity);
    let run_id: Arc<str> = Arc::from(run_id);

    for page in 1..=total_pages {
        tx.try_send(PageJob {
            page,
            run_id: run_id.clone(),
        })
        .map_err(|e| ScrapeError::Unexpected(format!("work queue rejected page {}: {}", page, e)))?;
    }

    // tx dropped here; workers see the queue end after the last page
    Ok(rx)
}
