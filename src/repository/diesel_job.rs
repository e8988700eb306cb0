//! Diesel-based job repository.

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::diesel_models::{JobRow, NewJob};
use super::pool::{AsyncSqlitePool, DieselError};
use crate::models::{JobRecord, SalaryType, StoredJob};
use crate::schema::jobs;

impl From<JobRow> for StoredJob {
    fn from(row: JobRow) -> Self {
        StoredJob {
            dedupe_key: row.dedupe_key,
            title: row.title,
            employer: row.employer,
            city: row.city,
            province: row.province,
            salary_min: row.salary_min,
            salary_max: row.salary_max,
            salary_type: SalaryType::from_str(&row.salary_type),
            posted_on: row
                .posted_on
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            url: row.url,
            run_id: row.run_id,
        }
    }
}

/// Diesel-based job repository.
#[derive(Clone)]
pub struct DieselJobRepository {
    pool: AsyncSqlitePool,
}

impl DieselJobRepository {
    pub fn new(pool: AsyncSqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert a batch of records in one transaction, keyed by dedupe key.
    ///
    /// A conflict overwrites the listing's mutable fields and `run_id`, leaving
    /// `first_seen_run_id`/`first_seen_at` untouched. Returns the number of
    /// records written; on error nothing from the batch is kept.
    pub async fn upsert_batch(&self, records: &[JobRecord]) -> Result<usize, DieselError> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let rows: Vec<NewJob<'_>> = records
            .iter()
            .map(|record| NewJob {
                dedupe_key: record.dedupe_key(),
                external_id: record.external_id.as_deref(),
                title: &record.title,
                employer: record.employer.as_deref(),
                location_raw: record.location_raw.as_deref(),
                city: record.city.as_deref(),
                province: record.province.as_deref(),
                salary_raw: record.salary_raw.as_deref(),
                salary_min: record.salary.min,
                salary_max: record.salary.max,
                salary_type: record.salary.salary_type.as_str(),
                posted_on: record.posted_on.map(|d| d.format("%Y-%m-%d").to_string()),
                url: &record.url,
                source: &record.flags.source,
                external_posting: i32::from(record.flags.external_posting),
                run_id: &record.run_id,
                first_seen_run_id: &record.run_id,
                first_seen_at: &now,
                updated_at: &now,
            })
            .collect();

        let mut conn = self.pool.get().await?;
        let rows = &rows;

        conn.transaction(|conn| {
            Box::pin(async move {
                let mut written = 0;
                for row in rows {
                    written += diesel::insert_into(jobs::table)
                        .values(row)
                        .on_conflict(jobs::dedupe_key)
                        .do_update()
                        .set((
                            jobs::external_id.eq(excluded(jobs::external_id)),
                            jobs::title.eq(excluded(jobs::title)),
                            jobs::employer.eq(excluded(jobs::employer)),
                            jobs::location_raw.eq(excluded(jobs::location_raw)),
                            jobs::city.eq(excluded(jobs::city)),
                            jobs::province.eq(excluded(jobs::province)),
                            jobs::salary_raw.eq(excluded(jobs::salary_raw)),
                            jobs::salary_min.eq(excluded(jobs::salary_min)),
                            jobs::salary_max.eq(excluded(jobs::salary_max)),
                            jobs::salary_type.eq(excluded(jobs::salary_type)),
                            jobs::posted_on.eq(excluded(jobs::posted_on)),
                            jobs::url.eq(excluded(jobs::url)),
                            jobs::source.eq(excluded(jobs::source)),
                            jobs::external_posting.eq(excluded(jobs::external_posting)),
                            jobs::run_id.eq(excluded(jobs::run_id)),
                            jobs::updated_at.eq(excluded(jobs::updated_at)),
                        ))
                        .execute(conn)
                        .await?;
                }
                Ok(written)
            })
        })
        .await
    }

    /// Total stored listings.
    pub async fn count(&self) -> Result<u64, DieselError> {
        let mut conn = self.pool.get().await?;

        use diesel::dsl::count_star;
        let count: i64 = jobs::table.select(count_star()).first(&mut conn).await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Most recently updated listings first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<StoredJob>, DieselError> {
        let mut conn = self.pool.get().await?;

        jobs::table
            .order((jobs::updated_at.desc(), jobs::id.desc()))
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .load::<JobRow>(&mut conn)
            .await
            .map(|rows| rows.into_iter().map(StoredJob::from).collect())
    }

    /// Look a listing up by its dedupe key.
    pub async fn get_by_key(&self, dedupe_key: &str) -> Result<Option<JobRow>, DieselError> {
        let mut conn = self.pool.get().await?;

        jobs::table
            .filter(jobs::dedupe_key.eq(dedupe_key))
            .first::<JobRow>(&mut conn)
            .await
            .optional()
    }
}
