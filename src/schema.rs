// Kept in sync by hand with `DbContext::init_schema`.

diesel::table! {
    scraping_runs (id) {
        id -> Text,
        status -> Text,
        started_at -> Text,
        completed_at -> Nullable<Text>,
        total_pages -> Integer,
        jobs_scraped -> Integer,
        jobs_stored -> Integer,
        last_page_scraped -> Integer,
        error_message -> Nullable<Text>,
    }
}

diesel::table! {
    jobs (id) {
        id -> Integer,
        dedupe_key -> Text,
        external_id -> Nullable<Text>,
        title -> Text,
        employer -> Nullable<Text>,
        location_raw -> Nullable<Text>,
        city -> Nullable<Text>,
        province -> Nullable<Text>,
        salary_raw -> Nullable<Text>,
        salary_min -> Nullable<Double>,
        salary_max -> Nullable<Double>,
        salary_type -> Text,
        posted_on -> Nullable<Text>,
        url -> Text,
        source -> Text,
        external_posting -> Integer,
        run_id -> Text,
        first_seen_run_id -> Text,
        first_seen_at -> Text,
        updated_at -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(jobs, scraping_runs);
