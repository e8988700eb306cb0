//! Engine request and response types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One navigate-wait-extract cycle.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    /// Selector for a single record container; at least one must render.
    pub wait_selector: String,
    /// Bound on navigation plus the selector wait.
    pub timeout: Duration,
    /// Pause after the containers render, before extraction.
    pub settle: Duration,
    /// Script evaluated in the page; must return an array of records.
    pub script: String,
}

/// Untyped record as returned by the extraction script.
///
/// Every field is optional; presence is checked when converting to a
/// `JobRecord`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJobRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub employer: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub salary_text: Option<String>,
    #[serde(default)]
    pub date_text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_script_output_with_missing_fields() {
        let json = r#"[{"id":"1","title":"Cook","salaryText":"$18 hourly","url":"/jobposting/1"},{}]"#;
        let records: Vec<RawJobRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].salary_text.as_deref(), Some("$18 hourly"));
        assert_eq!(records[0].employer, None);
        assert_eq!(records[1], RawJobRecord::default());
    }
}
