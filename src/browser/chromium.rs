//! Chrome DevTools (chromiumoxide) implementation of the engine traits.
//!
//! Local mode launches one headless Chrome per session with a throwaway
//! profile directory, so no cookies or storage leak between pages. Remote
//! mode (`remote_url` / `BROWSER_URL`) opens a new connection and page on an
//! existing browser per session and never closes the browser itself.

#[cfg(feature = "browser")]
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tempfile::TempDir;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;

use super::config::BrowserEngineConfig;
use super::types::{FetchRequest, RawJobRecord};
use super::{BrowserEngine, BrowserSession, EngineError};

#[cfg(feature = "browser")]
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Interval between selector probes while waiting for content.
#[cfg(feature = "browser")]
const SELECTOR_POLL: Duration = Duration::from_millis(250);

/// Common Chrome executable paths to check.
#[cfg(feature = "browser")]
const CHROME_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

/// Engine that hands out chromiumoxide-backed sessions.
#[derive(Debug, Clone)]
pub struct ChromiumEngine {
    config: BrowserEngineConfig,
}

impl ChromiumEngine {
    pub fn new(config: BrowserEngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrowserEngineConfig {
        &self.config
    }
}

#[cfg(feature = "browser")]
impl ChromiumEngine {
    /// Find the Chrome executable: configured path, well-known paths, then `PATH`.
    fn find_chrome(&self) -> Result<PathBuf, EngineError> {
        if let Some(ref path) = self.config.chrome_path {
            return Ok(PathBuf::from(
                shellexpand::tilde(&path.to_string_lossy()).into_owned(),
            ));
        }

        for path in CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                debug!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in [
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                debug!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(EngineError::Launch(
            "Chrome/Chromium not found. Install it or set browser.chrome_path".to_string(),
        ))
    }

    async fn launch(&self) -> Result<ChromiumSession, EngineError> {
        let chrome_path = self.find_chrome()?;
        let profile = TempDir::new()
            .map_err(|e| EngineError::Launch(format!("profile directory: {}", e)))?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .user_data_dir(profile.path())
            .launch_timeout(Duration::from_secs(self.config.launch_timeout));

        // with_head means NOT headless
        if !self.config.headless {
            builder = builder.with_head();
        }

        if let Some(ref proxy) = self.config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--disable-translate")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        for arg in &self.config.chrome_args {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| EngineError::Launch(format!("invalid browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| EngineError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        ChromiumSession::open(browser, handler, true, Some(profile)).await
    }

    async fn connect_remote(&self, url: &str) -> Result<ChromiumSession, EngineError> {
        debug!("Connecting to remote browser at {}", url);

        // Resolve the WebSocket URL from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.launch_timeout))
            .build()
            .map_err(|e| EngineError::Launch(e.to_string()))?;
        let resp: serde_json::Value = client
            .get(&version_url)
            .send()
            .await
            .map_err(|e| EngineError::Launch(format!("remote browser unreachable: {}", e)))?
            .json()
            .await
            .map_err(|e| EngineError::Launch(format!("bad browser version info: {}", e)))?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| EngineError::Launch("no webSocketDebuggerUrl in response".to_string()))?;

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: Duration::from_secs(self.config.launch_timeout),
            ..Default::default()
        };

        let (browser, mut handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| EngineError::Launch(format!("remote browser connect: {}", e)))?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        ChromiumSession::open(browser, handler, false, None).await
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, EngineError> {
        let session = match self.config.remote_url.clone() {
            Some(url) => self.connect_remote(&url).await?,
            None => self.launch().await?,
        };
        Ok(Box::new(session))
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, EngineError> {
        Err(EngineError::Launch(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}

/// One page in one browser, owned by a single worker for a single page of results.
#[cfg(feature = "browser")]
pub struct ChromiumSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler: JoinHandle<()>,
    /// Launched by us, so closing the session closes the browser.
    owns_browser: bool,
    _profile: Option<TempDir>,
}

#[cfg(feature = "browser")]
impl ChromiumSession {
    async fn open(
        browser: Browser,
        handler: JoinHandle<()>,
        owns_browser: bool,
        profile: Option<TempDir>,
    ) -> Result<Self, EngineError> {
        let page = browser.new_page("about:blank").await;
        let mut session = Self {
            browser: Some(browser),
            page: None,
            handler,
            owns_browser,
            _profile: profile,
        };

        let page = match page {
            Ok(page) => page,
            Err(e) => {
                session.close().await;
                return Err(EngineError::Launch(format!("new page: {}", e)));
            }
        };

        if let Err(e) = page
            .execute(SetUserAgentOverrideParams::new(BROWSER_USER_AGENT.to_string()))
            .await
        {
            warn!("Failed to set user agent: {}", e);
        }

        session.page = Some(page);
        Ok(session)
    }

    fn page(&self) -> Result<&Page, EngineError> {
        self.page
            .as_ref()
            .ok_or_else(|| EngineError::Navigation("session already closed".to_string()))
    }

    /// Navigate and wait until `selector` matches, bounded by `timeout`.
    async fn navigate_and_wait(
        &self,
        url: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<chromiumoxide::element::Element, EngineError> {
        let page = self.page()?;

        info!("Navigating to {}", url);
        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| EngineError::Navigation(format!("invalid URL {}: {}", url, e)))?;

        let wait = async {
            page.execute(nav_params)
                .await
                .map_err(|e| EngineError::Navigation(e.to_string()))?;

            // find_element fails immediately when nothing matches yet
            loop {
                match page.find_element(selector).await {
                    Ok(element) => return Ok(element),
                    Err(_) => tokio::time::sleep(SELECTOR_POLL).await,
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => {
                // Distinguish "never loaded" from "loaded without the element"
                let loaded = page
                    .url()
                    .await
                    .ok()
                    .flatten()
                    .map(|u| u != "about:blank")
                    .unwrap_or(false);
                if loaded {
                    Err(EngineError::ElementNotFound {
                        url: url.to_string(),
                        selector: selector.to_string(),
                    })
                } else {
                    Err(EngineError::NavigationTimeout {
                        url: url.to_string(),
                        timeout,
                    })
                }
            }
        }
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn fetch(&mut self, request: &FetchRequest) -> Result<Vec<RawJobRecord>, EngineError> {
        self.navigate_and_wait(&request.url, &request.wait_selector, request.timeout)
            .await?;

        if !request.settle.is_zero() {
            tokio::time::sleep(request.settle).await;
        }

        let page = self.page()?;
        let result = page
            .evaluate(request.script.clone())
            .await
            .map_err(|e| EngineError::ScriptEvaluation(e.to_string()))?;

        let records: Vec<RawJobRecord> = result
            .into_value()
            .map_err(|e| EngineError::ScriptEvaluation(format!("unexpected result shape: {}", e)))?;

        debug!("Extracted {} raw records from {}", records.len(), request.url);
        Ok(records)
    }

    async fn read_text(
        &mut self,
        url: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<String, EngineError> {
        let element = self.navigate_and_wait(url, selector, timeout).await?;
        let text = element
            .inner_text()
            .await
            .map_err(|e| EngineError::ScriptEvaluation(e.to_string()))?;
        Ok(text.unwrap_or_default())
    }

    async fn close(&mut self) {
        if let Some(page) = self.page.take() {
            if let Err(e) = page.close().await {
                debug!("Failed to close page: {}", e);
            }
        }

        if let Some(mut browser) = self.browser.take() {
            if self.owns_browser {
                if let Err(e) = browser.close().await {
                    debug!("Failed to close browser: {}", e);
                }
            }
        }

        self.handler.abort();
    }
}

#[cfg(feature = "browser")]
impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
