//! Count prober: how many pages does the listing have?

use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

use super::config::ScraperConfig;
use super::error::ScrapeError;
use crate::browser::BrowserEngine;

/// First number in the text, with optional 3-digit groups split by `,`, `_`,
/// a space, a no-break space or a thin space.
static LEADING_INTEGER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:[,_ \x{a0}\x{202f}\x{2009}]\d{3})+\b|\d+").unwrap()
});

/// Result of the count probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub total_items: u64,
    pub total_pages: u32,
}

/// Parse the leading integer of a results summary such as `1,234 jobs found`.
///
/// The first number in the text wins, so `count_selector` should point at the
/// element holding the total rather than a "showing 1-25 of N" range.
pub fn parse_total_count(text: &str) -> Result<u64, ScrapeError> {
    LEADING_INTEGER
        .find(text)
        .and_then(|m| {
            m.as_str()
                .chars()
                .filter(char::is_ascii_digit)
                .collect::<String>()
                .parse::<u64>()
                .ok()
        })
        .ok_or_else(|| ScrapeError::Parse {
            text: text.trim().to_string(),
        })
}

/// `ceil(count / page_size)`, capped at `max_pages` when it is non-zero.
pub fn total_pages(count: u64, page_size: u32, max_pages: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    let pages = u32::try_from(count.div_ceil(page_size)).unwrap_or(u32::MAX);
    if max_pages > 0 {
        pages.min(max_pages)
    } else {
        pages
    }
}

/// Read the total count from page 1 in a session of its own.
pub async fn probe(
    engine: &dyn BrowserEngine,
    config: &ScraperConfig,
) -> Result<ProbeOutcome, ScrapeError> {
    let url = config.page_url(1);
    debug!("Probing result count at {}", url);

    let mut session = engine.open_session().await?;
    let text = session
        .read_text(&url, &config.count_selector, config.probe_timeout())
        .await;
    session.close().await;

    let total_items = parse_total_count(&text?)?;
    let total_pages = total_pages(total_items, config.page_size, config.max_pages);

    info!(
        "Listing reports {} items across {} page(s)",
        total_items, total_pages
    );

    Ok(ProbeOutcome {
        total_items,
        total_pages,
    })
}
