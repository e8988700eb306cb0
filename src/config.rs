//! Configuration management for jobscout using the prefer crate.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::browser::BrowserEngineConfig;
use crate::repository::DbContext;
use crate::scrapers::ScraperConfig;

/// Default database filename.
pub const DEFAULT_DATABASE_FILENAME: &str = "jobscout.db";

/// Extensions treated as a database file rather than a directory.
const DB_EXTENSIONS: [&str; 3] = ["db", "sqlite", "sqlite3"];

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename inside `data_dir`.
    pub database_filename: String,
    /// Database URL (overrides data_dir/database_filename if set).
    pub database_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        // Documents dir -> Home dir -> Current dir
        let data_dir = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jobscout");

        Self {
            data_dir,
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Get the database URL, constructing from path if not explicitly set.
    pub fn database_url(&self) -> String {
        match self.database_url {
            Some(ref url) => url.clone(),
            None => format!("sqlite:{}", self.database_path().display()),
        }
    }

    /// Get the full path to the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// Check if the database file exists yet.
    pub fn database_exists(&self) -> bool {
        self.database_url.is_some() || self.database_path().exists()
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        tracing::debug!("Ensuring data dir {}", self.data_dir.display());
        fs::create_dir_all(&self.data_dir).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create data directory '{}': {}",
                    self.data_dir.display(),
                    e
                ),
            )
        })
    }

    /// Create a database context for the configured database.
    pub fn create_db_context(&self) -> DbContext {
        DbContext::from_url(&self.database_url())
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Data directory path.
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "target")]
    pub data_dir: Option<String>,
    /// Database filename.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Listing, extraction and concurrency settings.
    #[serde(default)]
    pub scraper: ScraperConfig,
    /// Browser launch settings.
    #[serde(default)]
    pub browser: BrowserEngineConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover a jobscout config file in the standard locations.
    pub async fn load() -> Self {
        // prefer finds the file; serde does the parsing
        match prefer::load("jobscout").await {
            Ok(found) => match found.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("{}; using defaults", e);
                        Self::default_with_env()
                    }
                },
                None => Self::default_with_env(),
            },
            Err(_) => Self::default_with_env(),
        }
    }

    /// Defaults with environment overrides applied.
    pub fn default_with_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `BROWSER_URL` and `JOBSCOUT_WORKERS` on top of file values.
    pub fn with_env_overrides(mut self) -> Self {
        self.scraper = self.scraper.with_env_overrides();
        self.browser = self.browser.with_env_overrides();
        self
    }

    /// Load configuration from a specific file path.
    /// Format follows the extension: TOML, YAML, otherwise JSON.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config.with_env_overrides())
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, String> {
        match ext {
            "toml" => toml::from_str(contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e)),
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Directory of the config file, for resolving relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a possibly relative, possibly `~`-prefixed path against `base_dir`.
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Apply configuration to settings.
    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = self.resolve_path(data_dir, base_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides discovery).
    pub config_path: Option<PathBuf>,
    /// Data directory or database file (`--target`).
    pub target: Option<PathBuf>,
}

/// Split a `--target` value into a data directory and database filename.
/// A path with a database extension names the file; anything else is a directory.
fn resolve_target(path: &Path) -> (PathBuf, String) {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let mut path = PathBuf::from(expanded);
    if !path.is_absolute() {
        path = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path);
    }

    let is_db_file = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DB_EXTENSIONS.contains(&ext))
        || path.is_file();

    if is_db_file {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_DATABASE_FILENAME)
            .to_string();
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        (dir, filename)
    } else {
        (path, DEFAULT_DATABASE_FILENAME.to_string())
    }
}

/// Look for `jobscout.{ext}` or `config.{ext}` inside a data directory.
fn find_config_in_dir(data_dir: &Path) -> Option<PathBuf> {
    let extensions = ["toml", "yaml", "yml", "json"];
    let basenames = ["jobscout", "config"];

    basenames
        .iter()
        .flat_map(|base| extensions.iter().map(move |ext| format!("{}.{}", base, ext)))
        .map(|name| data_dir.join(name))
        .find(|path| path.exists())
}

/// `DATABASE_URL` from the environment, if set to a SQLite URL.
fn database_url_from_env() -> Option<String> {
    let url = std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty())?;
    if url.starts_with("sqlite:") || !url.contains("://") {
        Some(url)
    } else {
        tracing::warn!("Ignoring DATABASE_URL: only SQLite databases are supported");
        None
    }
}

async fn load_file_config(options: &LoadOptions, target_dir: Option<&Path>) -> Config {
    // Priority 1: explicit --config
    if let Some(ref config_path) = options.config_path {
        return match Config::load_from_path(config_path).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("{}; using defaults", e);
                Config::default_with_env()
            }
        };
    }

    // Priority 2: config inside the target directory
    if let Some(dir) = target_dir {
        if let Some(config_path) = find_config_in_dir(dir) {
            tracing::debug!("Found config next to data dir: {}", config_path.display());
            if let Ok(config) = Config::load_from_path(&config_path).await {
                return config;
            }
        }
    }

    // Priority 3: discovery
    Config::load().await
}

/// Load settings with explicit options.
/// Returns (Settings, Config) tuple.
pub async fn load_settings_with_options(options: LoadOptions) -> (Settings, Config) {
    let target = options.target.as_deref().map(resolve_target);
    let config = load_file_config(&options, target.as_ref().map(|(dir, _)| dir.as_path())).await;

    let mut settings = Settings::default();
    let base_dir = config
        .base_dir()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
    config.apply_to_settings(&mut settings, &base_dir);

    // --target beats the file
    if let Some((dir, filename)) = target {
        settings.data_dir = dir;
        settings.database_filename = filename;
    }

    // DATABASE_URL beats everything
    if let Some(url) = database_url_from_env() {
        tracing::debug!("Using DATABASE_URL from environment: {}", url);
        settings.database_url = Some(url);
    }

    (settings, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn toml_tables_fill_nested_configs() {
        let config = Config::parse(
            r#"
            data_dir = "~/scrapes"
            [scraper]
            page_size = 50
            max_pages = 4
            [browser]
            headless = false
            "#,
            "toml",
        )
        .unwrap();
        assert_eq!(config.data_dir.as_deref(), Some("~/scrapes"));
        assert_eq!(config.scraper.page_size, 50);
        assert_eq!(config.scraper.max_pages, 4);
        assert_eq!(config.scraper.batch_size, 100);
        assert!(!config.browser.headless);
    }

    #[test]
    fn yaml_and_json_parse_the_same_shape() {
        let yaml = Config::parse("database: other.db\nscraper:\n  workers: 3\n", "yaml").unwrap();
        let json =
            Config::parse(r#"{"database":"other.db","scraper":{"workers":3}}"#, "json").unwrap();
        assert_eq!(yaml.database, json.database);
        assert_eq!(yaml.scraper.workers, Some(3));
        assert_eq!(json.scraper.workers, Some(3));
    }

    #[test]
    fn relative_data_dir_resolves_against_config_dir() {
        let config = Config {
            data_dir: Some("data".into()),
            ..Default::default()
        };
        let mut settings = Settings::default();
        config.apply_to_settings(&mut settings, Path::new("/etc/jobscout"));
        assert_eq!(settings.data_dir, PathBuf::from("/etc/jobscout/data"));
        assert_eq!(
            settings.database_url(),
            "sqlite:/etc/jobscout/data/jobscout.db"
        );
    }

    #[test]
    fn target_accepts_directory_or_file() {
        let (dir, file) = resolve_target(Path::new("/srv/scout"));
        assert_eq!(dir, PathBuf::from("/srv/scout"));
        assert_eq!(file, DEFAULT_DATABASE_FILENAME);

        let (dir, file) = resolve_target(Path::new("/srv/scout/listings.sqlite"));
        assert_eq!(dir, PathBuf::from("/srv/scout"));
        assert_eq!(file, "listings.sqlite");
    }

    #[tokio::test]
    async fn config_next_to_target_is_loaded() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("jobscout.toml"),
            "[scraper]\nsource = \"staging\"\n",
        )
        .unwrap();

        let (settings, config) = load_settings_with_options(LoadOptions {
            config_path: None,
            target: Some(dir.path().to_path_buf()),
        })
        .await;
        assert_eq!(config.scraper.source, "staging");
        assert_eq!(settings.data_dir, dir.path());
        assert_eq!(
            config.source_path.as_deref(),
            Some(dir.path().join("jobscout.toml").as_path())
        );
    }

    #[test]
    fn ensure_directories_creates_data_dir() {
        let dir = tempdir().unwrap();
        let settings = Settings::with_data_dir(dir.path().join("nested/data"));
        settings.ensure_directories().unwrap();
        assert!(settings.data_dir.is_dir());
        assert!(!settings.database_exists());
    }
}
