//! jobscout - concurrent browser-driven scraper for paginated job listings.
//!
//! The library exposes the pipeline (`scrapers`), the engine seam (`browser`)
//! and the SQLite store (`repository`); the binary wraps them in a CLI.

pub mod browser;
pub mod cli;
pub mod config;
pub mod models;
pub mod repository;
pub mod schema;
pub mod scrapers;
pub mod utils;
