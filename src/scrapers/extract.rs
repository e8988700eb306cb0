//! Turning raw script output into job records.

use tracing::debug;

use crate::browser::RawJobRecord;
use crate::models::{JobRecord, SourceFlags};
use crate::utils::{
    absolutize, external_id, is_external_posting, parse_location, parse_posted_date, parse_salary,
};

/// Built-in extraction script. Evaluated as an expression; must yield an array
/// of objects with `id`, `title`, `employer`, `location`, `salaryText`,
/// `dateText` and `url` (any may be missing).
pub const DEFAULT_EXTRACTION_SCRIPT: &str = r#"
(() => {
    const text = (root, sel) => {
        const el = root.querySelector(sel);
        return el ? el.textContent.replace(/\s+/g, ' ').trim() : null;
    };
    return Array.from(document.querySelectorAll('article.resultJobItem, article[id^="article-"]')).map((item) => {
        const link = item.querySelector('a');
        const rawId = item.getAttribute('id');
        return {
            id: rawId ? rawId.replace(/^article-/, '') : null,
            title: text(item, '.noctitle'),
            employer: text(item, '.business'),
            location: text(item, '.location'),
            salaryText: text(item, '.salary'),
            dateText: text(item, '.date'),
            url: link ? link.getAttribute('href') : null,
        };
    });
})()
"#;

/// What a worker needs to turn raw records into `JobRecord`s.
#[derive(Debug, Clone)]
pub struct ExtractContext {
    pub run_id: String,
    pub source: String,
    /// Base for resolving relative links.
    pub listing_url: String,
    pub listing_host: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ExtractContext {
    /// Convert one raw record. Records without a title or URL are rejected.
    pub fn to_job_record(&self, raw: RawJobRecord) -> Option<JobRecord> {
        let title = non_blank(raw.title)?;
        let url = absolutize(&non_blank(raw.url)?, &self.listing_url);

        let location_raw = non_blank(raw.location);
        let location = location_raw
            .as_deref()
            .map(parse_location)
            .unwrap_or_default();

        let salary_raw = non_blank(raw.salary_text);
        let salary = salary_raw
            .as_deref()
            .map(parse_salary)
            .unwrap_or_default();

        Some(JobRecord {
            external_id: external_id(raw.id.as_deref(), &url, self.listing_host.as_deref()),
            title,
            employer: non_blank(raw.employer),
            location_raw,
            city: location.city,
            province: location.province,
            salary_raw,
            salary,
            posted_on: raw.date_text.as_deref().and_then(parse_posted_date),
            flags: SourceFlags {
                source: self.source.clone(),
                external_posting: is_external_posting(&url, self.listing_host.as_deref()),
            },
            url,
            run_id: self.run_id.clone(),
        })
    }

    /// Convert a page of raw records, returning the kept records and the
    /// number rejected.
    pub fn convert_page(&self, raws: Vec<RawJobRecord>) -> (Vec<JobRecord>, usize) {
        let total = raws.len();
        let records: Vec<JobRecord> = raws
            .into_iter()
            .filter_map(|raw| self.to_job_record(raw))
            .collect();
        let dropped = total - records.len();
        if dropped > 0 {
            debug!("Dropped {} record(s) without title or URL", dropped);
        }
        (records, dropped)
    }
}
