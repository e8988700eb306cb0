//! Browser engine configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Browser engine configuration, the `[browser]` table of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    /// Set to false to watch the scrape in a visible window.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default)]
    pub proxy: Option<String>,

    /// Explicit Chrome executable. Searched for when unset.
    #[serde(default)]
    pub chrome_path: Option<PathBuf>,

    /// Additional Chrome arguments.
    #[serde(default)]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, sessions are opened on the existing browser instead of launching one.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Seconds allowed for launching or connecting to a browser.
    #[serde(default = "default_launch_timeout")]
    pub launch_timeout: u64,
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            proxy: None,
            chrome_path: None,
            chrome_args: Vec::new(),
            remote_url: None,
            launch_timeout: default_launch_timeout(),
        }
    }
}

pub fn default_headless() -> bool {
    true
}

pub fn default_launch_timeout() -> u64 {
    30
}

impl BrowserEngineConfig {
    /// Apply environment overrides (`BROWSER_URL`).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("BROWSER_URL") {
            let url = url.trim();
            if !url.is_empty() {
                self.remote_url = Some(url.to_string());
            }
        }
        self
    }
}
