//! The SQLite `JobStore` across several runs.

use jobscout::models::{JobRecord, RunProgress, RunStatus, RunTotals, Salary, SalaryType, SourceFlags};
use jobscout::browser::RawJobRecord;
use jobscout::repository::{DbContext, JobStore};
use jobscout::scrapers::ExtractContext;

fn record(id: &str, title: &str, run_id: &str) -> JobRecord {
    JobRecord {
        external_id: Some(id.to_string()),
        title: title.to_string(),
        employer: Some("Northern Freight".to_string()),
        location_raw: Some("Thunder Bay (ON)".to_string()),
        city: Some("Thunder Bay".to_string()),
        province: Some("ON".to_string()),
        salary_raw: Some("$28.00 hourly".to_string()),
        salary: Salary {
            min: Some(28.0),
            max: Some(28.0),
            salary_type: SalaryType::Hourly,
        },
        posted_on: None,
        url: format!("https://www.jobbank.gc.ca/jobsearch/jobposting/{}", id),
        flags: SourceFlags {
            source: "jobbank".to_string(),
            external_posting: false,
        },
        run_id: run_id.to_string(),
    }
}

async fn database() -> (DbContext, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = DbContext::new(&dir.path().join("store.db"));
    ctx.init_schema().await.unwrap();
    (ctx, dir)
}

#[tokio::test]
async fn same_identifier_across_runs_keeps_one_row() {
    let (db, _dir) = database().await;

    let first = db.create_run().await.unwrap();
    db.upsert_jobs(&[record("41001", "Truck driver", &first.id)])
        .await
        .unwrap();

    let second = db.create_run().await.unwrap();
    let mut updated = record("41001", "Long-haul truck driver", &second.id);
    updated.salary = Salary {
        min: Some(30.0),
        max: Some(32.0),
        salary_type: SalaryType::Hourly,
    };
    db.upsert_jobs(&[updated]).await.unwrap();

    assert_eq!(db.count_jobs().await.unwrap(), 1);
    let row = db.jobs().get_by_key("id:41001").await.unwrap().unwrap();
    assert_eq!(row.title, "Long-haul truck driver");
    assert_eq!(row.salary_max, Some(32.0));
    assert_eq!(row.run_id, second.id);
    assert_eq!(row.first_seen_run_id, first.id);
}

#[tokio::test]
async fn terminal_runs_stay_terminal() {
    let (db, _dir) = database().await;
    let run = db.create_run().await.unwrap();

    let totals = RunTotals {
        total_pages: 5,
        jobs_scraped: 98,
        jobs_stored: 98,
    };
    assert!(db.update_completed(&run.id, totals).await.unwrap());

    assert!(!db
        .update_status(&run.id, RunStatus::Failed, Some("late failure"))
        .await
        .unwrap());
    assert!(!db
        .update_progress(
            &run.id,
            RunProgress {
                total_pages: 5,
                jobs_scraped: 1,
                jobs_stored: 0,
                last_page: 1,
            },
        )
        .await
        .unwrap());

    let stored = db.get_run(&run.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RunStatus::Completed);
    assert_eq!(stored.jobs_scraped, 98);
    assert!(stored.error_message.is_none());
}

#[tokio::test]
async fn failed_run_records_its_message() {
    let (db, _dir) = database().await;
    let run = db.create_run().await.unwrap();

    assert!(db
        .update_status(&run.id, RunStatus::Failed, Some("could not parse total count"))
        .await
        .unwrap());

    let stored = db.get_run(&run.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RunStatus::Failed);
    assert_eq!(
        stored.error_message.as_deref(),
        Some("could not parse total count")
    );
    assert!(stored.completed_at.is_some());
}

#[tokio::test]
async fn off_host_posting_does_not_collide_with_a_listing_id() {
    let (db, _dir) = database().await;
    let run = db.create_run().await.unwrap();
    let extract = ExtractContext {
        run_id: run.id.clone(),
        source: "jobbank".to_string(),
        listing_url: "https://www.jobbank.gc.ca/jobsearch/jobsearch?page=1".to_string(),
        listing_host: Some("www.jobbank.gc.ca".to_string()),
    };

    let raws = vec![
        RawJobRecord {
            title: Some("Line cook".into()),
            url: Some("/jobsearch/jobposting/9".into()),
            ..Default::default()
        },
        RawJobRecord {
            title: Some("Sous chef".into()),
            url: Some("https://careers.example.com/9".into()),
            ..Default::default()
        },
    ];
    let (records, dropped) = extract.convert_page(raws);
    assert_eq!(dropped, 0);
    db.upsert_jobs(&records).await.unwrap();

    assert_eq!(db.count_jobs().await.unwrap(), 2);
    let listed = db.jobs().get_by_key("id:9").await.unwrap().unwrap();
    assert_eq!(listed.title, "Line cook");
    let external = db
        .jobs()
        .get_by_key("url:https://careers.example.com/9")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(external.title, "Sous chef");
    assert_eq!(external.external_posting, 1);
}
