//! Runs command: recent scraping runs.

use console::style;

use crate::cli::icons;
use crate::config::Settings;
use crate::models::{RunStatus, ScrapingRun};

/// List the most recent runs, newest first.
pub async fn cmd_runs(settings: &Settings, limit: usize, json: bool) -> anyhow::Result<()> {
    if !settings.database_exists() {
        println!(
            "{} No database yet. Run 'jobscout init' first.",
            icons::warn()
        );
        return Ok(());
    }

    let ctx = settings.create_db_context();
    let runs = ctx.recent_runs(limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("{} No runs recorded", icons::info());
        return Ok(());
    }

    println!(
        "{:<38} {:<10} {:<20} {:>6} {:>8} {:>8} {:>9}",
        style("RUN").bold(),
        "STATUS",
        "STARTED",
        "PAGES",
        "SCRAPED",
        "STORED",
        "DURATION"
    );
    for run in &runs {
        println!(
            "{:<38} {} {:<20} {:>6} {:>8} {:>8} {:>9}",
            run.id,
            status_label(run.status),
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.total_pages,
            run.jobs_scraped,
            run.jobs_stored,
            format_duration(run)
        );
        if let Some(ref message) = run.error_message {
            println!("  {} {}", icons::error(), style(message).dim());
        }
    }

    Ok(())
}

/// Colored status, padded before styling so columns stay aligned.
fn status_label(status: RunStatus) -> String {
    let padded = format!("{:<10}", status.as_str());
    match status {
        RunStatus::Running => style(padded).cyan().to_string(),
        RunStatus::Completed => style(padded).green().to_string(),
        RunStatus::Failed => style(padded).red().to_string(),
    }
}

fn format_duration(run: &ScrapingRun) -> String {
    match run.duration() {
        Some(d) if d.num_hours() > 0 => format!("{}h{:02}m", d.num_hours(), d.num_minutes() % 60),
        Some(d) if d.num_minutes() > 0 => format!("{}m{:02}s", d.num_minutes(), d.num_seconds() % 60),
        Some(d) => format!("{}s", d.num_seconds()),
        None => "-".to_string(),
    }
}
