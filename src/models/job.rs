//! Job listing models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Pay period attached to a salary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryType {
    Hourly,
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Annual,
    #[default]
    Unknown,
}

impl SalaryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Annual => "annual",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "hourly" => Self::Hourly,
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "biweekly" => Self::Biweekly,
            "monthly" => Self::Monthly,
            "annual" => Self::Annual,
            _ => Self::Unknown,
        }
    }
}

/// Where a listing came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFlags {
    /// Short name of the listing service.
    pub source: String,
    /// The listing links away from the listing service's own host.
    pub external_posting: bool,
}

/// Derived salary fields.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Salary {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub salary_type: SalaryType,
}

/// One real-world job listing.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub external_id: Option<String>,
    pub title: String,
    pub employer: Option<String>,
    pub location_raw: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub salary_raw: Option<String>,
    pub salary: Salary,
    pub posted_on: Option<NaiveDate>,
    pub url: String,
    pub flags: SourceFlags,
    pub run_id: String,
}

impl JobRecord {
    /// Upsert key: the external identifier when known, otherwise the URL.
    pub fn dedupe_key(&self) -> String {
        match self.external_id {
            Some(ref id) => format!("id:{}", id),
            None => format!("url:{}", self.url),
        }
    }
}

/// A stored job row as read back for display.
#[derive(Debug, Clone, Serialize)]
pub struct StoredJob {
    pub dedupe_key: String,
    pub title: String,
    pub employer: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_type: SalaryType,
    pub posted_on: Option<NaiveDate>,
    pub url: String,
    pub run_id: String,
}
