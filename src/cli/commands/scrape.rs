//! Scrape command.

use std::sync::Arc;

use anyhow::Context;
use console::style;
use tokio::sync::mpsc;

use crate::browser::ChromiumEngine;
use crate::cli::icons;
use crate::cli::progress::ScrapeProgress;
use crate::config::{Config, Settings};
use crate::models::RunStatus;
use crate::repository::{JobStore, NullJobStore};
use crate::scrapers::{RunSummary, ScrapeOrchestrator};

/// Flags accepted by `jobscout scrape`.
#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    pub max_pages: Option<u32>,
    pub dry_run: bool,
    pub workers: Option<usize>,
    pub progress: bool,
    pub json: bool,
}

/// Run one full scrape.
pub async fn cmd_scrape(
    settings: &Settings,
    config: &Config,
    options: ScrapeOptions,
) -> anyhow::Result<()> {
    let mut scraper = config.scraper.clone();
    if let Some(max_pages) = options.max_pages {
        scraper.max_pages = max_pages;
    }

    let store: Arc<dyn JobStore> = if options.dry_run {
        Arc::new(NullJobStore)
    } else {
        settings.ensure_directories()?;
        let ctx = settings.create_db_context();
        ctx.init_schema()
            .await
            .with_context(|| format!("Failed to open {}", settings.database_url()))?;
        Arc::new(ctx)
    };

    let engine = Arc::new(ChromiumEngine::new(config.browser.clone()));
    let mut orchestrator = ScrapeOrchestrator::new(engine, store, scraper)
        .with_workers(options.workers)
        .dry_run(options.dry_run);

    if !options.json {
        println!(
            "{} Scraping {} with {} worker(s){}",
            icons::info(),
            style(config.scraper.page_url(1)).cyan(),
            orchestrator.workers(),
            if options.dry_run { " (dry run)" } else { "" }
        );
    }

    let progress_task = if options.progress && !options.json {
        let (tx, rx) = mpsc::channel(256);
        orchestrator = orchestrator.with_events(tx);
        Some(ScrapeProgress::new().spawn(rx))
    } else {
        None
    };

    let result = orchestrator.run().await;
    // Dropping the orchestrator closes the event channel so the bar finishes
    drop(orchestrator);
    if let Some(task) = progress_task {
        let _ = task.await;
    }
    let summary = result.context("Could not start scraping run")?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if summary.status == RunStatus::Failed {
        anyhow::bail!(
            "run {} failed: {}",
            summary.run_id,
            summary.error_message.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let icon = match summary.status {
        RunStatus::Completed if summary.error_count == 0 => icons::success(),
        RunStatus::Completed => icons::warn(),
        _ => icons::error(),
    };

    println!(
        "{} Run {} {} in {:.1}s",
        icon,
        style(&summary.run_id).dim(),
        summary.status,
        summary.elapsed.as_secs_f64()
    );
    if let Some(total) = summary.total_items {
        println!(
            "  {} {} listings across {} page(s)",
            icons::info(),
            total,
            summary.total_pages
        );
    }
    println!(
        "  {} {}/{} pages, {} failed",
        icons::info(),
        summary.completed_pages,
        summary.total_pages,
        summary.error_count
    );
    println!(
        "  {} {} jobs scraped, {} stored{}",
        icons::info(),
        summary.jobs_scraped,
        summary.jobs_stored,
        if summary.dry_run { " (dry run)" } else { "" }
    );
    if summary.dropped_records > 0 {
        println!(
            "  {} {} record(s) dropped for missing title or URL",
            icons::warn(),
            summary.dropped_records
        );
    }
    if !summary.failed_pages.is_empty() {
        let pages: Vec<String> = summary.failed_pages.iter().map(u32::to_string).collect();
        println!("  {} Failed pages: {}", icons::warn(), pages.join(", "));
    }
    if summary.failed_batches > 0 {
        println!(
            "  {} {} batch(es) could not be stored",
            icons::warn(),
            summary.failed_batches
        );
    }
    if let Some(ref message) = summary.error_message {
        println!("  {} {}", icons::error(), message);
    }
}
