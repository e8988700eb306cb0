//! Listing identity helpers derived from URLs.

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Trailing numeric path segment, e.g. `/jobposting/41234567`.
static TRAILING_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/(\d+)/?$").unwrap());

/// Stable external id: the raw id when present, else the trailing number in the URL path.
///
/// The URL fallback only applies to links on the listing host; off-host postings
/// get no id and dedupe on their URL instead.
pub fn external_id(raw_id: Option<&str>, url: &str, listing_host: Option<&str>) -> Option<String> {
    if let Some(id) = raw_id.map(str::trim).filter(|id| !id.is_empty()) {
        return Some(id.to_string());
    }
    if is_external_posting(url, listing_host) {
        return None;
    }

    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.split(['?', '#']).next().unwrap_or(url).to_string());

    TRAILING_ID.captures(&path).map(|caps| caps[1].to_string())
}

/// True when `url` points at a different host than the listing service.
///
/// Unparseable URLs are treated as local.
pub fn is_external_posting(url: &str, listing_host: Option<&str>) -> bool {
    let Some(listing_host) = listing_host else {
        return false;
    };
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
        .map(|host| {
            let listing_host = listing_host.to_ascii_lowercase();
            host != listing_host && !host.ends_with(&format!(".{}", listing_host))
        })
        .unwrap_or(false)
}

/// Resolve a possibly-relative listing link against the listing URL.
pub fn absolutize(link: &str, base: &str) -> String {
    match Url::parse(base).and_then(|b| b.join(link)) {
        Ok(joined) => joined.to_string(),
        Err(_) => link.to_string(),
    }
}
