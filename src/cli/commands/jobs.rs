//! Jobs command: most recently updated listings.

use console::style;

use crate::cli::icons;
use crate::config::Settings;
use crate::models::{SalaryType, StoredJob};

/// Show stored listings, most recently updated first.
pub async fn cmd_jobs(settings: &Settings, limit: usize) -> anyhow::Result<()> {
    if !settings.database_exists() {
        println!(
            "{} No database yet. Run 'jobscout init' first.",
            icons::warn()
        );
        return Ok(());
    }

    let ctx = settings.create_db_context();
    let total = ctx.count_jobs().await?;
    let jobs = ctx.recent_jobs(limit).await?;

    println!(
        "{} {} stored listing(s), showing {}",
        icons::info(),
        total,
        jobs.len()
    );
    for job in &jobs {
        println!("{}", style(&job.title).bold());
        println!(
            "    {}  {}  {}",
            job.employer.as_deref().unwrap_or("-"),
            format_location(job),
            format_salary(job)
        );
        println!("    {}", style(&job.url).dim());
    }

    Ok(())
}

fn format_location(job: &StoredJob) -> String {
    match (job.city.as_deref(), job.province.as_deref()) {
        (Some(city), Some(province)) => format!("{}, {}", city, province),
        (Some(city), None) => city.to_string(),
        (None, Some(province)) => province.to_string(),
        (None, None) => "-".to_string(),
    }
}

fn format_salary(job: &StoredJob) -> String {
    let per = match job.salary_type {
        SalaryType::Unknown => String::new(),
        other => format!(" {}", other.as_str()),
    };
    match (job.salary_min, job.salary_max) {
        (Some(min), Some(max)) if min == max => format!("${:.2}{}", min, per),
        (Some(min), Some(max)) => format!("${:.2}-${:.2}{}", min, max, per),
        (Some(v), None) | (None, Some(v)) => format!("${:.2}{}", v, per),
        (None, None) => "-".to_string(),
    }
}
