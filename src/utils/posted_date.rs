//! Best-effort parsing of posting dates.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static POSTED_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(date\s+)?posted(\s+on)?\s*:?\s*").unwrap());

/// Formats tried in order against the cleaned text.
const FORMATS: &[&str] = &[
    "%Y-%m-%d",  // 2024-03-15
    "%B %d, %Y", // March 15, 2024
    "%b %d, %Y", // Mar 15, 2024
    "%d %B %Y",  // 15 March 2024
    "%d %b %Y",  // 15 Mar 2024
];

/// Parse a posting date, tolerating a leading `Posted on` label.
pub fn parse_posted_date(text: &str) -> Option<NaiveDate> {
    let cleaned = POSTED_PREFIX.replace(text, "");
    let cleaned = cleaned.trim().trim_end_matches('.');
    if cleaned.is_empty() {
        return None;
    }

    // "Sept." shows up on some listings; chrono only knows "Sep".
    let cleaned = cleaned.replace("Sept ", "Sep ").replace("Sept. ", "Sep ");

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
}
