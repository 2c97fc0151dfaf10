// Tests for database functionality

use seoprobe_core::data::{AnalysisStore, Database, PageBundle, PageRecord};
use seoprobe_core::job::{CrawlJob, JobState, SiteTechnology};
use seoprobe_scanner::{Finding, FindingKind, ImageRef, LinkKind, LinkRef};
use tempfile::TempDir;

fn create_test_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path).unwrap();
    (temp_dir, db)
}

fn record(url: &str, is_seed: bool) -> PageRecord {
    PageRecord {
        url: url.to_string(),
        status_code: 200,
        title: "A reasonable page title".to_string(),
        meta_description: None,
        score: 87,
        is_seed,
        robots_txt: is_seed.then_some(true),
        sitemap_xml: is_seed.then_some(false),
    }
}

fn bundle(url: &str, is_seed: bool) -> PageBundle {
    PageBundle {
        record: record(url, is_seed),
        findings: vec![
            Finding::error("No meta description found."),
            Finding::new(FindingKind::Recommendation, "Write a meta description."),
        ],
        images: vec![ImageRef {
            url: format!("{}logo.png", url),
            alt: String::new(),
        }],
        links: vec![
            LinkRef {
                url: format!("{}about", url),
                text: "About".to_string(),
                kind: LinkKind::Internal,
            },
            LinkRef {
                url: "https://other.example/".to_string(),
                text: "Other".to_string(),
                kind: LinkKind::External,
            },
        ],
    }
}

// ============================================================================
// Database Creation Tests
// ============================================================================

#[test]
fn test_database_creation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let db = Database::new(&db_path);
    assert!(db.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_database_exists_and_drop() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    assert!(!Database::exists(&db_path));
    let db = Database::new(&db_path).unwrap();
    assert!(Database::exists(&db_path));
    drop(db);

    Database::drop(&db_path).unwrap();
    assert!(!Database::exists(&db_path));
}

#[test]
fn test_reopen_keeps_schema_and_rows() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let job_id = {
        let db = Database::new(&db_path).unwrap();
        db.create_job(&CrawlJob::single("example.com").unwrap()).unwrap()
    };

    let db = Database::new(&db_path).unwrap();
    assert!(db.get_job(&job_id).unwrap().is_some());
}

// ============================================================================
// Job Tests
// ============================================================================

#[test]
fn test_create_job() {
    let (_temp_dir, db) = create_test_db();
    let job = CrawlJob::multiple("example.com", 4)
        .unwrap()
        .with_technology(SiteTechnology::Shopify);

    let job_id = db.create_job(&job).unwrap();
    let stored = db.get_job(&job_id).unwrap().unwrap();

    assert_eq!(stored.seed_url, "https://example.com/");
    assert_eq!(stored.scope, "multiple_pages");
    assert_eq!(stored.page_budget, 4);
    assert_eq!(stored.technology.as_deref(), Some("shopify"));
    assert_eq!(stored.status, "running");
    assert!(stored.end_time.is_none());
}

#[test]
fn test_finish_job() {
    let (_temp_dir, db) = create_test_db();
    let job_id = db.create_job(&CrawlJob::single("example.com").unwrap()).unwrap();

    db.finish_job(&job_id, JobState::Failed, Some("seed unreachable"))
        .unwrap();

    let stored = db.get_job(&job_id).unwrap().unwrap();
    assert_eq!(stored.status, "failed");
    assert_eq!(stored.message.as_deref(), Some("seed unreachable"));
    assert!(stored.end_time.unwrap() >= stored.start_time);
}

#[test]
fn test_unknown_job() {
    let (_temp_dir, db) = create_test_db();
    assert!(db.get_job("missing").unwrap().is_none());
    assert!(db.get_pages_by_job("missing").unwrap().is_empty());
}

// ============================================================================
// Page Tests
// ============================================================================

#[test]
fn test_save_page_with_children() {
    let (_temp_dir, db) = create_test_db();
    let job_id = db.create_job(&CrawlJob::single("example.com").unwrap()).unwrap();

    let page_id = db
        .save_page(&job_id, &bundle("https://example.com/", true))
        .unwrap();

    let pages = db.get_pages_by_job(&job_id).unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].id, page_id);
    assert_eq!(pages[0].record, record("https://example.com/", true));

    let findings = db.get_findings_by_page(page_id).unwrap();
    assert_eq!(findings.len(), 2);
    assert_eq!(findings[0].kind, FindingKind::Error);
    assert_eq!(findings[1].kind, FindingKind::Recommendation);

    let images = db.get_images_by_page(page_id).unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].alt, "");

    let links = db.get_links_by_page(page_id).unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].kind, LinkKind::Internal);
    assert_eq!(links[1].kind, LinkKind::External);
}

#[test]
fn test_seed_page_listed_first() {
    let (_temp_dir, db) = create_test_db();
    let job_id = db
        .create_job(&CrawlJob::multiple("example.com", 3).unwrap())
        .unwrap();

    db.save_page(&job_id, &bundle("https://example.com/a/", false))
        .unwrap();
    db.save_page(&job_id, &bundle("https://example.com/", true))
        .unwrap();
    db.save_page(&job_id, &bundle("https://example.com/b/", false))
        .unwrap();

    let urls: Vec<String> = db
        .get_pages_by_job(&job_id)
        .unwrap()
        .into_iter()
        .map(|p| p.record.url)
        .collect();
    assert_eq!(
        urls,
        vec![
            "https://example.com/",
            "https://example.com/a/",
            "https://example.com/b/"
        ]
    );
}

#[test]
fn test_duplicate_url_in_job_is_rejected_atomically() {
    let (_temp_dir, db) = create_test_db();
    let job_id = db.create_job(&CrawlJob::single("example.com").unwrap()).unwrap();

    let first = db
        .save_page(&job_id, &bundle("https://example.com/", true))
        .unwrap();
    let second = db.save_page(&job_id, &bundle("https://example.com/", true));
    assert!(second.is_err());

    let pages = db.get_pages_by_job(&job_id).unwrap();
    assert_eq!(pages.len(), 1);
    assert_eq!(db.get_findings_by_page(first).unwrap().len(), 2);

    let orphan_findings: i64 = db
        .get_connection()
        .query_row("SELECT COUNT(*) FROM findings", [], |row| row.get(0))
        .unwrap();
    assert_eq!(orphan_findings, 2);
}

#[test]
fn test_same_url_allowed_across_jobs() {
    let (_temp_dir, db) = create_test_db();
    let job = CrawlJob::single("example.com").unwrap();
    let a = db.create_job(&job).unwrap();
    let b = db.create_job(&job).unwrap();

    assert!(db.save_page(&a, &bundle("https://example.com/", true)).is_ok());
    assert!(db.save_page(&b, &bundle("https://example.com/", true)).is_ok());
}

#[test]
fn test_page_for_unknown_job_is_rejected() {
    let (_temp_dir, db) = create_test_db();
    assert!(
        db.save_page("no-such-job", &bundle("https://example.com/", true))
            .is_err()
    );
}

#[test]
fn test_out_of_range_score_is_rejected() {
    let (_temp_dir, db) = create_test_db();
    let job_id = db.create_job(&CrawlJob::single("example.com").unwrap()).unwrap();

    let mut page = bundle("https://example.com/", true);
    page.record.score = 101;
    assert!(db.save_page(&job_id, &page).is_err());
    assert!(db.get_pages_by_job(&job_id).unwrap().is_empty());
}

// ============================================================================
// Aggregate Tests
// ============================================================================

#[test]
fn test_finding_counts_by_kind() {
    let (_temp_dir, db) = create_test_db();
    let job_id = db
        .create_job(&CrawlJob::multiple("example.com", 2).unwrap())
        .unwrap();

    db.save_page(&job_id, &bundle("https://example.com/", true))
        .unwrap();
    db.save_page(&job_id, &bundle("https://example.com/a", false))
        .unwrap();

    let mut counts = db.get_finding_counts_by_kind(&job_id).unwrap();
    counts.sort();
    assert_eq!(
        counts,
        vec![("error".to_string(), 2), ("recommendation".to_string(), 2)]
    );
}

#[test]
fn test_cascade_delete_removes_children() {
    let (_temp_dir, db) = create_test_db();
    let job_id = db.create_job(&CrawlJob::single("example.com").unwrap()).unwrap();
    db.save_page(&job_id, &bundle("https://example.com/", true))
        .unwrap();

    db.get_connection()
        .execute("DELETE FROM jobs WHERE id = ?1", [&job_id])
        .unwrap();

    for table in ["pages", "findings", "images", "links"] {
        let count: i64 = db
            .get_connection()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 0, "{} not emptied", table);
    }
}
