//! Scraping run models.
//!
//! A run is created when a scrape starts and moves from `running` to exactly
//! one terminal state. The store refuses to mutate terminal runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a scraping run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Terminal states accept no further mutation.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted record of one scrape invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingRun {
    pub id: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub total_pages: u32,
    pub jobs_scraped: u32,
    pub jobs_stored: u32,
    /// Number of pages completed when the last snapshot was written.
    pub last_page_scraped: u32,
    pub error_message: Option<String>,
}

impl ScrapingRun {
    /// Create a fresh run in the `running` state.
    pub fn start() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            total_pages: 0,
            jobs_scraped: 0,
            jobs_stored: 0,
            last_page_scraped: 0,
            error_message: None,
        }
    }

    /// Wall-clock duration, if the run has finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }
}

/// Progress snapshot written by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunProgress {
    pub total_pages: u32,
    pub jobs_scraped: u32,
    pub jobs_stored: u32,
    pub last_page: u32,
}

/// Final totals written by the finalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTotals {
    pub total_pages: u32,
    pub jobs_scraped: u32,
    pub jobs_stored: u32,
}
