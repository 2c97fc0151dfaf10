use crate::job::{CrawlJob, JobState};
use rusqlite::{Connection, OptionalExtension, params};
use seoprobe_scanner::{Finding, FindingKind, ImageRef, LinkKind, LinkRef};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// One analysed page, as handed to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub status_code: u16,
    pub title: String,
    pub meta_description: Option<String>,
    pub score: u8,
    pub is_seed: bool,
    /// Only set on the seed page.
    pub robots_txt: Option<bool>,
    /// Only set on the seed page.
    pub sitemap_xml: Option<bool>,
}

/// A page record with its children, persisted as one unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageBundle {
    pub record: PageRecord,
    pub findings: Vec<Finding>,
    pub images: Vec<ImageRef>,
    pub links: Vec<LinkRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredJob {
    pub id: String,
    pub seed_url: String,
    pub scope: String,
    pub page_budget: u32,
    pub technology: Option<String>,
    pub status: String,
    pub message: Option<String>,
    pub start_time: i64,
    pub end_time: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredPage {
    pub id: i64,
    pub record: PageRecord,
    pub analysed_at: i64,
}

/// Persistence collaborator used by the crawl orchestrator.
pub trait AnalysisStore {
    fn create_job(&self, job: &CrawlJob) -> Result<String>;

    /// Persist a page and all of its children atomically.
    fn save_page(&self, job_id: &str, page: &PageBundle) -> Result<i64>;

    fn finish_job(&self, job_id: &str, state: JobState, message: Option<&str>) -> Result<()>;
}

pub struct Database {
    conn: Connection,
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

impl Database {
    pub fn drop(path: &Path) -> Result<()> {
        fs::remove_file(path)?;
        Ok(())
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    seed_url TEXT NOT NULL,
    scope TEXT NOT NULL CHECK(scope IN ('single_url', 'multiple_pages')),
    page_budget INTEGER NOT NULL CHECK(page_budget >= 1),
    technology TEXT,
    status TEXT NOT NULL CHECK(status IN ('idle', 'running', 'completed', 'failed')),
    message TEXT,
    start_time INTEGER NOT NULL,
    end_time INTEGER
);

CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id TEXT NOT NULL,
    url TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    title TEXT NOT NULL,
    meta_description TEXT,
    score INTEGER NOT NULL CHECK(score BETWEEN 0 AND 100),
    is_seed BOOLEAN NOT NULL DEFAULT 0,
    robots_txt BOOLEAN,
    sitemap_xml BOOLEAN,
    analysed_at INTEGER NOT NULL,

    FOREIGN KEY(job_id) REFERENCES jobs(id) ON DELETE CASCADE,
    UNIQUE(job_id, url)
);

CREATE INDEX IF NOT EXISTS idx_pages_job ON pages(job_id);

CREATE TABLE IF NOT EXISTS findings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL,
    kind TEXT NOT NULL CHECK(kind IN ('error', 'warning', 'info', 'recommendation')),
    description TEXT NOT NULL,
    created_at INTEGER NOT NULL,

    FOREIGN KEY(page_id) REFERENCES pages(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_findings_page ON findings(page_id);
CREATE INDEX IF NOT EXISTS idx_findings_kind ON findings(kind);

CREATE TABLE IF NOT EXISTS images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL,
    url TEXT NOT NULL,
    alt TEXT NOT NULL DEFAULT '',

    FOREIGN KEY(page_id) REFERENCES pages(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_images_page ON images(page_id);

CREATE TABLE IF NOT EXISTS links (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    page_id INTEGER NOT NULL,
    url TEXT NOT NULL,
    text TEXT NOT NULL DEFAULT '',
    kind TEXT NOT NULL CHECK(kind IN ('internal', 'external')),

    FOREIGN KEY(page_id) REFERENCES pages(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_links_page ON links(page_id);
            ",
        )?;
        Ok(())
    }

    pub fn get_job(&self, job_id: &str) -> Result<Option<StoredJob>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, seed_url, scope, page_budget, technology, status, message, start_time, end_time
             FROM jobs WHERE id = ?1",
        )?;

        let job = stmt
            .query_row(params![job_id], |row| {
                Ok(StoredJob {
                    id: row.get(0)?,
                    seed_url: row.get(1)?,
                    scope: row.get(2)?,
                    page_budget: row.get(3)?,
                    technology: row.get(4)?,
                    status: row.get(5)?,
                    message: row.get(6)?,
                    start_time: row.get(7)?,
                    end_time: row.get(8)?,
                })
            })
            .optional()?;
        Ok(job)
    }

    /// Seed page first, then the rest in insertion order.
    pub fn get_pages_by_job(&self, job_id: &str) -> Result<Vec<StoredPage>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url, status_code, title, meta_description, score, is_seed,
                    robots_txt, sitemap_xml, analysed_at
             FROM pages WHERE job_id = ?1
             ORDER BY is_seed DESC, id",
        )?;

        let pages = stmt
            .query_map(params![job_id], |row| {
                Ok(StoredPage {
                    id: row.get(0)?,
                    record: PageRecord {
                        url: row.get(1)?,
                        status_code: row.get(2)?,
                        title: row.get(3)?,
                        meta_description: row.get(4)?,
                        score: row.get(5)?,
                        is_seed: row.get(6)?,
                        robots_txt: row.get(7)?,
                        sitemap_xml: row.get(8)?,
                    },
                    analysed_at: row.get(9)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(pages)
    }

    pub fn get_findings_by_page(&self, page_id: i64) -> Result<Vec<Finding>> {
        let mut stmt = self
            .conn
            .prepare("SELECT kind, description FROM findings WHERE page_id = ?1 ORDER BY id")?;

        let rows = stmt
            .query_map(params![page_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(kind, description)| {
                FindingKind::from_str(&kind)
                    .map(|kind| Finding { kind, description })
                    .ok_or_else(|| StoreError::Corrupt(format!("unknown finding kind '{}'", kind)))
            })
            .collect()
    }

    pub fn get_images_by_page(&self, page_id: i64) -> Result<Vec<ImageRef>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url, alt FROM images WHERE page_id = ?1 ORDER BY id")?;

        let images = stmt
            .query_map(params![page_id], |row| {
                Ok(ImageRef {
                    url: row.get(0)?,
                    alt: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(images)
    }

    pub fn get_links_by_page(&self, page_id: i64) -> Result<Vec<LinkRef>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url, text, kind FROM links WHERE page_id = ?1 ORDER BY id")?;

        let rows = stmt
            .query_map(params![page_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(url, text, kind)| {
                LinkKind::from_str(&kind)
                    .map(|kind| LinkRef { url, text, kind })
                    .ok_or_else(|| StoreError::Corrupt(format!("unknown link kind '{}'", kind)))
            })
            .collect()
    }

    pub fn get_finding_counts_by_kind(&self, job_id: &str) -> Result<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT f.kind, COUNT(*)
             FROM findings f
             JOIN pages p ON f.page_id = p.id
             WHERE p.job_id = ?1
             GROUP BY f.kind",
        )?;

        let counts = stmt
            .query_map(params![job_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(counts)
    }

    pub fn get_connection(&self) -> &Connection {
        &self.conn
    }
}

impl AnalysisStore for Database {
    fn create_job(&self, job: &CrawlJob) -> Result<String> {
        let job_id = uuid::Uuid::new_v4().to_string();

        self.conn.execute(
            "INSERT INTO jobs (id, seed_url, scope, page_budget, technology, status, start_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &job_id,
                &job.seed_url,
                job.scope.as_str(),
                job.page_budget,
                job.technology.map(|t| t.as_str()),
                JobState::Running.as_str(),
                current_timestamp(),
            ],
        )?;

        Ok(job_id)
    }

    fn save_page(&self, job_id: &str, page: &PageBundle) -> Result<i64> {
        let timestamp = current_timestamp();
        let record = &page.record;
        // dropped without commit on any early return, which rolls back
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO pages (
                job_id, url, status_code, title, meta_description, score,
                is_seed, robots_txt, sitemap_xml, analysed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                job_id,
                &record.url,
                record.status_code,
                &record.title,
                &record.meta_description,
                record.score,
                record.is_seed,
                record.robots_txt,
                record.sitemap_xml,
                timestamp,
            ],
        )?;
        let page_id = tx.last_insert_rowid();

        {
            let mut insert_finding = tx.prepare(
                "INSERT INTO findings (page_id, kind, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for finding in &page.findings {
                insert_finding.execute(params![
                    page_id,
                    finding.kind.as_str(),
                    &finding.description,
                    timestamp
                ])?;
            }

            let mut insert_image =
                tx.prepare("INSERT INTO images (page_id, url, alt) VALUES (?1, ?2, ?3)")?;
            for image in &page.images {
                insert_image.execute(params![page_id, &image.url, &image.alt])?;
            }

            let mut insert_link = tx.prepare(
                "INSERT INTO links (page_id, url, text, kind) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for link in &page.links {
                insert_link.execute(params![page_id, &link.url, &link.text, link.kind.as_str()])?;
            }
        }

        tx.commit()?;
        Ok(page_id)
    }

    fn finish_job(&self, job_id: &str, state: JobState, message: Option<&str>) -> Result<()> {
        self.conn.execute(
            "UPDATE jobs SET status = ?1, message = ?2, end_time = ?3 WHERE id = ?4",
            params![state.as_str(), message, current_timestamp(), job_id],
        )?;
        Ok(())
    }
}
