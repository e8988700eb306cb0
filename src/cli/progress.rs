//! Live progress display for a scrape run.
//!
//! Consumes `ScrapeEvent`s from the orchestrator and renders a single page
//! bar; per-page failures and batch problems are printed above it.

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::icons;
use crate::scrapers::ScrapeEvent;

/// Progress bar fed from a scrape event channel.
pub struct ScrapeProgress {
    bar: ProgressBar,
}

impl ScrapeProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len} pages ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        bar.set_message("Probing listing");
        bar.enable_steady_tick(std::time::Duration::from_millis(120));
        Self { bar }
    }

    /// Fold one event into the display.
    pub fn handle(&self, event: &ScrapeEvent) {
        match event {
            ScrapeEvent::Started {
                total_items,
                total_pages,
                workers,
                ..
            } => {
                self.bar.set_length(u64::from(*total_pages));
                self.bar.set_message(format!(
                    "{} listings, {} worker(s)",
                    total_items, workers
                ));
            }
            ScrapeEvent::PageCompleted {
                page,
                failed,
                completed_pages,
                jobs_scraped,
                ..
            } => {
                if *failed {
                    self.bar
                        .println(format!("  {} Page {} failed", icons::warn(), page));
                }
                self.bar.set_position(u64::from(*completed_pages));
                self.bar.set_message(format!("{} jobs", jobs_scraped));
            }
            ScrapeEvent::BatchStored { batch, stored } => {
                self.bar
                    .set_message(format!("Stored batch {} ({} jobs)", batch, stored));
            }
            ScrapeEvent::BatchFailed { batch, error } => {
                self.bar.println(format!(
                    "  {} Batch {} skipped: {}",
                    icons::error(),
                    batch,
                    error
                ));
            }
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    /// Drain `events` on a background task until the sender side is dropped.
    pub fn spawn(self, mut events: mpsc::Receiver<ScrapeEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.handle(&event);
            }
            self.finish();
        })
    }
}

impl Default for ScrapeProgress {
    fn default() -> Self {
        Self::new()
    }
}
