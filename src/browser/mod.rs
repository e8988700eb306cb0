//! Browser automation engine.
//!
//! The scraper only talks to the listing service through these traits. Every
//! session is isolated: one page of results, one session, torn down after use.
//! `ChromiumEngine` drives a real Chrome over CDP; tests plug in scripted fakes.

mod chromium;
mod config;
mod types;

pub use chromium::ChromiumEngine;
pub use config::{default_headless, default_launch_timeout, BrowserEngineConfig};
pub use types::{FetchRequest, RawJobRecord};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single engine operation. Fatal to the current attempt only.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("navigation to {url} timed out after {timeout:?}")]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("element '{selector}' not found on {url}")]
    ElementNotFound { url: String, selector: String },

    #[error("extraction script failed: {0}")]
    ScriptEvaluation(String),

    #[error("failed to start browser: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),
}

impl EngineError {
    /// True when the page never rendered what we waited for.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::NavigationTimeout { .. })
    }
}

/// Factory for isolated browser sessions.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Open a fresh session that shares no state with any other.
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, EngineError>;
}

/// One isolated browsing context.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate, wait for record containers, settle, then run the extraction script.
    async fn fetch(&mut self, request: &FetchRequest) -> Result<Vec<RawJobRecord>, EngineError>;

    /// Navigate and return the inner text of the first element matching `selector`.
    async fn read_text(
        &mut self,
        url: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<String, EngineError>;

    /// Tear the session down. Never fails; problems are logged.
    async fn close(&mut self);
}
