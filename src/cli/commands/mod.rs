//! CLI parser and command dispatch.

mod init;
mod jobs;
mod runs;
mod scrape;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "jobscout")]
#[command(about = "Scrape paginated job listings into SQLite")]
#[command(version)]
pub struct Cli {
    /// Target directory or database file (overrides config file).
    /// Can be a directory containing jobscout.db or a .db file directly.
    #[arg(long, short = 't', global = true)]
    target: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Scrape every listing page and store the results
    Scrape {
        /// Stop after this many pages (0 = all pages)
        #[arg(short, long)]
        max_pages: Option<u32>,
        /// Scrape without writing anything to the database
        #[arg(long)]
        dry_run: bool,
        /// Number of browser workers (1-8; derived from CPU count by default)
        #[arg(short, long, env = "JOBSCOUT_WORKERS")]
        workers: Option<usize>,
        /// Show a live progress bar
        #[arg(short = 'P', long)]
        progress: bool,
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List recent scraping runs
    Runs {
        /// Number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show stored job listings
    Jobs {
        /// Number of listings to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        target: cli.target,
    };
    let (settings, config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings, &config).await,
        Commands::Scrape {
            max_pages,
            dry_run,
            workers,
            progress,
            json,
        } => {
            let options = scrape::ScrapeOptions {
                max_pages,
                dry_run,
                workers,
                progress,
                json,
            };
            scrape::cmd_scrape(&settings, &config, options).await
        }
        Commands::Runs { limit, json } => runs::cmd_runs(&settings, limit, json).await,
        Commands::Jobs { limit } => jobs::cmd_jobs(&settings, limit).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_flags_parse() {
        let cli = Cli::try_parse_from([
            "jobscout",
            "--target",
            "/tmp/scout",
            "scrape",
            "--max-pages",
            "0",
            "--dry-run",
            "--workers",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.target, Some(PathBuf::from("/tmp/scout")));
        match cli.command {
            Commands::Scrape {
                max_pages,
                dry_run,
                workers,
                progress,
                ..
            } => {
                assert_eq!(max_pages, Some(0));
                assert!(dry_run);
                assert_eq!(workers, Some(3));
                assert!(!progress);
            }
            _ => panic!("expected scrape"),
        }
    }

    #[test]
    fn runs_defaults() {
        let cli = Cli::try_parse_from(["jobscout", "runs", "--json"]).unwrap();
        match cli.command {
            Commands::Runs { limit, json } => {
                assert_eq!(limit, 10);
                assert!(json);
            }
            _ => panic!("expected runs"),
        }
    }
}
