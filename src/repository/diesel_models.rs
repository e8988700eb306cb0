//! Diesel ORM models for database tables.
//!
//! Times are stored as RFC 3339 text and enums as their `as_str` form.

use diesel::prelude::*;

use crate::schema;

/// Scraping run record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::scraping_runs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RunRecord {
    pub id: String,
    pub status: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub total_pages: i32,
    pub jobs_scraped: i32,
    pub jobs_stored: i32,
    pub last_page_scraped: i32,
    pub error_message: Option<String>,
}

/// New scraping run for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::scraping_runs)]
pub struct NewRun<'a> {
    pub id: &'a str,
    pub status: &'a str,
    pub started_at: &'a str,
    pub completed_at: Option<&'a str>,
    pub total_pages: i32,
    pub jobs_scraped: i32,
    pub jobs_stored: i32,
    pub last_page_scraped: i32,
    pub error_message: Option<&'a str>,
}

/// Job record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct JobRow {
    pub id: i32,
    pub dedupe_key: String,
    pub external_id: Option<String>,
    pub title: String,
    pub employer: Option<String>,
    pub location_raw: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    pub salary_raw: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_type: String,
    pub posted_on: Option<String>,
    pub url: String,
    pub source: String,
    pub external_posting: i32,
    pub run_id: String,
    pub first_seen_run_id: String,
    pub first_seen_at: String,
    pub updated_at: String,
}

/// New job for insertion. On conflict the `first_seen_*` columns are kept.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::jobs)]
pub struct NewJob<'a> {
    pub dedupe_key: String,
    pub external_id: Option<&'a str>,
    pub title: &'a str,
    pub employer: Option<&'a str>,
    pub location_raw: Option<&'a str>,
    pub city: Option<&'a str>,
    pub province: Option<&'a str>,
    pub salary_raw: Option<&'a str>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_type: &'a str,
    pub posted_on: Option<String>,
    pub url: &'a str,
    pub source: &'a str,
    pub external_posting: i32,
    pub run_id: &'a str,
    pub first_seen_run_id: &'a str,
    pub first_seen_at: &'a str,
    pub updated_at: &'a str,
}
