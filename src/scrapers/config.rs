//! Scraper configuration types.
//!
//! The `[scraper]` table of the config file: where the listing lives, how to
//! recognize its parts, and how hard to push it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::extract::DEFAULT_EXTRACTION_SCRIPT;
use super::worker::WorkerTiming;

/// Placeholder substituted with the page number in `listing_url`.
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Substitute `{page}` in a listing URL template, or append a `page` query
/// parameter when the template has no placeholder.
pub fn expand_page_url(template: &str, page: u32) -> String {
    if template.contains(PAGE_PLACEHOLDER) {
        template.replace(PAGE_PLACEHOLDER, &page.to_string())
    } else {
        let sep = if template.contains('?') { '&' } else { '?' };
        format!("{}{}page={}", template, sep, page)
    }
}

/// Scraper configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Short name recorded on every stored listing.
    #[serde(default = "default_source")]
    pub source: String,

    /// Listing URL template; `{page}` is replaced with the 1-based page number.
    #[serde(default = "default_listing_url")]
    pub listing_url: String,

    /// Items shown per listing page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Page ceiling, `0` for all pages.
    #[serde(default)]
    pub max_pages: u32,

    /// Element whose text starts with the total result count.
    #[serde(default = "default_count_selector")]
    pub count_selector: String,

    /// One element per listing; a page is rendered once one exists.
    #[serde(default = "default_record_selector")]
    pub record_selector: String,

    /// Replaces the built-in extraction script.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_script: Option<String>,

    /// Records per upsert transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Write a progress snapshot every N completed pages.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u32,

    /// Attempts per page, first try included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Bound on one attempt (session start plus fetch), in seconds.
    #[serde(default = "default_page_timeout")]
    pub page_timeout: u64,

    /// Bound on the count probe, in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout: u64,

    /// Bound on the whole aggregation phase, in seconds.
    #[serde(default = "default_run_timeout")]
    pub run_timeout: u64,

    /// Explicit worker count; derived from available parallelism when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    #[serde(default)]
    pub timing: TimingConfig,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            listing_url: default_listing_url(),
            page_size: default_page_size(),
            max_pages: 0,
            count_selector: default_count_selector(),
            record_selector: default_record_selector(),
            extraction_script: None,
            batch_size: default_batch_size(),
            progress_interval: default_progress_interval(),
            max_attempts: default_max_attempts(),
            page_timeout: default_page_timeout(),
            probe_timeout: default_probe_timeout(),
            run_timeout: default_run_timeout(),
            workers: None,
            timing: TimingConfig::default(),
        }
    }
}

/// Delays between worker actions, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Startup delay per worker index.
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,
    /// Backoff unit; attempt N waits N units before retrying.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
    /// Pause after records render, before extraction.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Pause before pulling the next page.
    #[serde(default = "default_inter_page_delay_ms")]
    pub inter_page_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            stagger_ms: default_stagger_ms(),
            backoff_ms: default_backoff_ms(),
            settle_ms: default_settle_ms(),
            inter_page_delay_ms: default_inter_page_delay_ms(),
        }
    }
}

fn default_source() -> String {
    "jobbank".to_string()
}

fn default_listing_url() -> String {
    "https://www.jobbank.gc.ca/jobsearch/jobsearch?sort=D&page={page}".to_string()
}

fn default_page_size() -> u32 {
    25
}

fn default_count_selector() -> String {
    "span.found".to_string()
}

fn default_record_selector() -> String {
    "article.resultJobItem".to_string()
}

fn default_batch_size() -> usize {
    100
}

fn default_progress_interval() -> u32 {
    10
}

fn default_max_attempts() -> u32 {
    2
}

fn default_page_timeout() -> u64 {
    45
}

fn default_probe_timeout() -> u64 {
    30
}

fn default_run_timeout() -> u64 {
    2 * 60 * 60
}

fn default_stagger_ms() -> u64 {
    500
}

fn default_backoff_ms() -> u64 {
    2000
}

fn default_settle_ms() -> u64 {
    1000
}

fn default_inter_page_delay_ms() -> u64 {
    1000
}

impl ScraperConfig {
    /// URL of a listing page.
    pub fn page_url(&self, page: u32) -> String {
        expand_page_url(&self.listing_url, page)
    }

    /// Host of the listing service, used to flag external postings.
    pub fn listing_host(&self) -> Option<String> {
        url::Url::parse(&self.page_url(1))
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }

    /// Extraction script in effect.
    pub fn script(&self) -> &str {
        self.extraction_script
            .as_deref()
            .unwrap_or(DEFAULT_EXTRACTION_SCRIPT)
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout)
    }

    pub fn worker_timing(&self) -> WorkerTiming {
        WorkerTiming {
            stagger: Duration::from_millis(self.timing.stagger_ms),
            backoff: Duration::from_millis(self.timing.backoff_ms),
            settle: Duration::from_millis(self.timing.settle_ms),
            inter_page_delay: Duration::from_millis(self.timing.inter_page_delay_ms),
        }
    }

    /// Apply environment overrides (`JOBSCOUT_WORKERS`).
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(workers) = std::env::var("JOBSCOUT_WORKERS")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
        {
            self.workers = Some(workers);
        }
        self
    }
}
