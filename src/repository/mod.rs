//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM over SQLite via diesel-async.

pub mod context;
pub mod diesel_job;
pub mod diesel_models;
pub mod diesel_run;
pub mod pool;
pub mod store;
pub mod util;

pub use context::DbContext;
pub use diesel_job::DieselJobRepository;
pub use diesel_models::{JobRow, NewJob, NewRun, RunRecord};
pub use diesel_run::DieselRunRepository;
pub use pool::{AsyncSqlitePool, DieselError};
pub use store::{JobStore, NullJobStore, StoreError};

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}
