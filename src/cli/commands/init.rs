//! Initialize command.

use anyhow::Context;

use crate::cli::icons;
use crate::config::{Config, Settings};

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings, config: &Config) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let ctx = settings.create_db_context();
    ctx.init_schema()
        .await
        .with_context(|| format!("Failed to initialize {}", settings.database_url()))?;

    match config.source_path {
        Some(ref path) => println!("  {} Config: {}", icons::info(), path.display()),
        None => println!(
            "  {} No jobscout config file found; using built-in defaults",
            icons::warn()
        ),
    }
    println!(
        "  {} Listing: {}",
        icons::info(),
        config.scraper.page_url(1)
    );

    println!(
        "{} Initialized jobscout in {}",
        icons::success(),
        settings.data_dir.display()
    );

    Ok(())
}
