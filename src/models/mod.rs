//! Data models for jobscout.

mod job;
mod run;

pub use job::{JobRecord, Salary, SalaryType, SourceFlags, StoredJob};
pub use run::{RunProgress, RunStatus, RunTotals, ScrapingRun};
