//! End-to-end runs against a scripted engine and a real SQLite store.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jobscout::browser::{
    BrowserEngine, BrowserSession, EngineError, FetchRequest, RawJobRecord,
};
use jobscout::models::RunStatus;
use jobscout::repository::DbContext;
use jobscout::scrapers::{ScrapeOrchestrator, ScraperConfig, TimingConfig};
use tempfile::TempDir;

const LISTING: &str = "https://jobs.example.com/search?sort=D&page={page}";

/// Listing of `count_text` items where every page is scripted.
#[derive(Default)]
struct ScriptedEngine {
    count_text: String,
    page_sizes: HashMap<u32, usize>,
    /// Pages that fail navigation on every attempt.
    broken: HashSet<u32>,
    /// Pages that never finish loading.
    hanging: HashSet<u32>,
    /// Title prefix, to tell runs apart.
    edition: String,
    attempts: Arc<Mutex<HashMap<u32, u32>>>,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

impl ScriptedEngine {
    /// 123 items, 25 per page, page 3 broken.
    fn standard() -> Self {
        Self {
            count_text: "123 jobs found".into(),
            page_sizes: HashMap::from([(1, 25), (2, 25), (3, 25), (4, 25), (5, 23)]),
            broken: HashSet::from([3]),
            edition: "v1".into(),
            ..Default::default()
        }
    }

    fn attempts(&self, page: u32) -> u32 {
        self.attempts
            .lock()
            .unwrap()
            .get(&page)
            .copied()
            .unwrap_or(0)
    }
}

struct ScriptedSession {
    engine: Arc<ScriptedEngine>,
}

/// Shares one scripted engine between the test and the orchestrator.
struct SharedEngine(Arc<ScriptedEngine>);

#[async_trait]
impl BrowserEngine for SharedEngine {
    async fn open_session(&self) -> Result<Box<dyn BrowserSession>, EngineError> {
        self.0.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            engine: self.0.clone(),
        }))
    }
}

fn page_of(url: &str) -> u32 {
    url.rsplit("page=")
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn fetch(&mut self, request: &FetchRequest) -> Result<Vec<RawJobRecord>, EngineError> {
        let page = page_of(&request.url);
        *self.engine.attempts.lock().unwrap().entry(page).or_insert(0) += 1;

        if self.engine.hanging.contains(&page) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.engine.broken.contains(&page) {
            return Err(EngineError::Navigation(format!(
                "net::ERR_CONNECTION_RESET at {}",
                request.url
            )));
        }

        let size = self.engine.page_sizes.get(&page).copied().unwrap_or(0);
        Ok((0..size)
            .map(|i| RawJobRecord {
                id: Some(format!("{}{:03}", page, i)),
                title: Some(format!("{} cook {}-{}", self.engine.edition, page, i)),
                employer: Some("Harbour Bistro".into()),
                location: Some("Halifax (NS)".into()),
                salary_text: Some("$18.00 to $21.50 hourly".into()),
                date_text: Some("January 15, 2025".into()),
                url: Some(format!("/jobsearch/jobposting/{}{:03}", page, i)),
            })
            .collect())
    }

    async fn read_text(
        &mut self,
        _url: &str,
        _selector: &str,
        _timeout: Duration,
    ) -> Result<String, EngineError> {
        Ok(self.engine.count_text.clone())
    }

    async fn close(&mut self) {
        self.engine.closed.fetch_add(1, Ordering::SeqCst);
    }
}

fn config() -> ScraperConfig {
    ScraperConfig {
        listing_url: LISTING.into(),
        workers: Some(2),
        timing: TimingConfig {
            stagger_ms: 0,
            backoff_ms: 0,
            settle_ms: 0,
            inter_page_delay_ms: 0,
        },
        ..Default::default()
    }
}

async fn database() -> (Arc<DbContext>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = DbContext::new(&dir.path().join("pipeline.db"));
    ctx.init_schema().await.unwrap();
    (Arc::new(ctx), dir)
}

#[tokio::test]
async fn failed_page_does_not_block_the_rest() {
    let (db, _dir) = database().await;
    let engine = Arc::new(ScriptedEngine::standard());

    let summary = ScrapeOrchestrator::new(Arc::new(SharedEngine(engine.clone())), db.clone(), config())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.total_items, Some(123));
    assert_eq!(summary.total_pages, 5);
    assert_eq!(summary.completed_pages, 5);
    assert_eq!(summary.error_count, 1);
    assert_eq!(summary.failed_pages, vec![3]);
    assert_eq!(summary.jobs_scraped, 98);
    assert_eq!(summary.jobs_stored, 98);
    assert_eq!(summary.failed_batches, 0);

    // Default is two attempts in total
    assert_eq!(engine.attempts(3), 2);
    assert_eq!(engine.attempts(1), 1);

    let run = db.get_run(&summary.run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.total_pages, 5);
    assert_eq!(run.jobs_scraped, 98);
    assert_eq!(run.jobs_stored, 98);
    assert!(run.completed_at.is_some());
    assert!(run.error_message.is_none());

    assert_eq!(db.count_jobs().await.unwrap(), 98);
}

#[tokio::test]
async fn derived_fields_are_stored() {
    let (db, _dir) = database().await;
    let engine = Arc::new(ScriptedEngine::standard());
    ScrapeOrchestrator::new(Arc::new(SharedEngine(engine)), db.clone(), config())
        .run()
        .await
        .unwrap();

    let row = db.jobs().get_by_key("id:1000").await.unwrap().unwrap();
    assert_eq!(row.title, "v1 cook 1-0");
    assert_eq!(row.city.as_deref(), Some("Halifax"));
    assert_eq!(row.province.as_deref(), Some("NS"));
    assert_eq!(row.salary_min, Some(18.0));
    assert_eq!(row.salary_max, Some(21.5));
    assert_eq!(row.salary_type, "hourly");
    assert_eq!(row.posted_on.as_deref(), Some("2025-01-15"));
    assert_eq!(row.url, "https://jobs.example.com/jobsearch/jobposting/1000");
    assert_eq!(row.external_posting, 0);
}

#[tokio::test]
async fn rerun_updates_rows_in_place() {
    let (db, _dir) = database().await;

    let first = ScrapeOrchestrator::new(
        Arc::new(SharedEngine(Arc::new(ScriptedEngine::standard()))),
        db.clone(),
        config(),
    )
    .run()
    .await
    .unwrap();

    let second_engine = ScriptedEngine {
        broken: HashSet::new(),
        edition: "v2".into(),
        ..ScriptedEngine::standard()
    };
    let second = ScrapeOrchestrator::new(
        Arc::new(SharedEngine(Arc::new(second_engine))),
        db.clone(),
        config(),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(second.jobs_stored, 123);
    assert_eq!(db.count_jobs().await.unwrap(), 123);

    let row = db.jobs().get_by_key("id:1000").await.unwrap().unwrap();
    assert_eq!(row.title, "v2 cook 1-0");
    assert_eq!(row.run_id, second.run_id);
    assert_eq!(row.first_seen_run_id, first.run_id);

    // Page 3 only appeared in the second run
    let row = db.jobs().get_by_key("id:3000").await.unwrap().unwrap();
    assert_eq!(row.first_seen_run_id, second.run_id);

    let runs = db.recent_runs(10).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| r.status == RunStatus::Completed));
}

#[tokio::test]
async fn dry_run_leaves_the_database_untouched() {
    let (db, _dir) = database().await;
    let engine = Arc::new(ScriptedEngine::standard());

    let summary = ScrapeOrchestrator::new(Arc::new(SharedEngine(engine)), db.clone(), config())
        .dry_run(true)
        .run()
        .await
        .unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.jobs_scraped, 98);
    assert_eq!(db.count_jobs().await.unwrap(), 0);
    assert!(db.recent_runs(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn max_pages_caps_dispatch() {
    let (db, _dir) = database().await;
    let engine = Arc::new(ScriptedEngine::standard());
    let config = ScraperConfig {
        max_pages: 2,
        ..config()
    };

    let summary = ScrapeOrchestrator::new(Arc::new(SharedEngine(engine.clone())), db.clone(), config)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.total_pages, 2);
    assert_eq!(summary.jobs_stored, 50);
    assert_eq!(engine.attempts(3), 0);
}

#[tokio::test]
async fn run_deadline_persists_partial_results() {
    let (db, _dir) = database().await;
    let engine = ScriptedEngine {
        broken: HashSet::new(),
        hanging: HashSet::from([2]),
        ..ScriptedEngine::standard()
    };
    let config = ScraperConfig {
        run_timeout: 1,
        ..config()
    };

    let summary = ScrapeOrchestrator::new(Arc::new(SharedEngine(Arc::new(engine))), db.clone(), config)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Failed);
    assert_eq!(summary.completed_pages, 4);
    assert_eq!(summary.jobs_scraped, 98);
    assert_eq!(summary.jobs_stored, 98);
    assert!(summary
        .error_message
        .as_deref()
        .unwrap()
        .contains("deadline"));

    let run = db.get_run(&summary.run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.jobs_stored, 98);
    assert_eq!(run.last_page_scraped, 4);
    assert_eq!(db.count_jobs().await.unwrap(), 98);
}

#[tokio::test]
async fn empty_listing_completes_with_nothing_stored() {
    let (db, _dir) = database().await;
    let engine = ScriptedEngine {
        count_text: "0 jobs found".into(),
        ..Default::default()
    };

    let summary = ScrapeOrchestrator::new(Arc::new(SharedEngine(Arc::new(engine))), db.clone(), config())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.total_pages, 0);
    assert_eq!(summary.completed_pages, 0);
    assert_eq!(db.count_jobs().await.unwrap(), 0);
}

#[tokio::test(start_paused = true)]
async fn page_timeout_fails_only_the_slow_page() {
    let (db, _dir) = database().await;
    let engine = Arc::new(ScriptedEngine {
        broken: HashSet::new(),
        hanging: HashSet::from([2]),
        ..ScriptedEngine::standard()
    });
    let config = ScraperConfig {
        page_timeout: 10,
        ..config()
    };

    let summary = ScrapeOrchestrator::new(Arc::new(SharedEngine(engine.clone())), db.clone(), config)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.completed_pages, 5);
    assert_eq!(summary.error_count, 1);
    assert_eq!(summary.failed_pages, vec![2]);
    assert_eq!(summary.jobs_stored, 98);
    assert_eq!(engine.attempts(2), 2);
    assert_eq!(db.count_jobs().await.unwrap(), 98);

    // Probe session plus one per attempt, all torn down
    let opened = engine.opened.load(Ordering::SeqCst);
    assert_eq!(opened, 1 + 4 + 2);
    assert_eq!(engine.closed.load(Ordering::SeqCst), opened);
}
