use crate::data::{AnalysisStore, PageBundle, PageRecord, StoreError};
use crate::job::{CrawlJob, CrawlScope, JobState};
use crate::recommend::{RecommendationProvider, RecommendationRequest};
use indicatif::{ProgressBar, ProgressStyle};
use seoprobe_scanner::{
    Finding, FindingKind, Frontier, LinkDiscoverer, PageAnalysis, PageFetcher, ScanError,
    SiteFileChecker, SiteFilesReport, analyze_html,
};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

const ERROR_PENALTY: i32 = 10;
const WARNING_PENALTY: i32 = 5;
const INFO_PENALTY: i32 = 1;
const MISSING_SITE_FILE_PENALTY: i32 = 2;

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("Invalid seed URL: {0}")]
    InvalidSeed(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] ScanError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Options for configuring a crawl operation
pub struct CrawlOptions {
    pub job: CrawlJob,
    pub show_progress_bars: bool,
}

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub page_id: i64,
    pub url: String,
    pub status_code: u16,
    pub score: u8,
    /// Findings excluding recommendations.
    pub finding_count: usize,
    pub is_seed: bool,
}

/// What a finished crawl produced.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlOutcome {
    pub job_id: String,
    pub state: JobState,
    pub pages: Vec<PageSummary>,
    /// Every URL taken off the frontier, skipped ones included.
    pub visited: usize,
    pub skipped: usize,
    pub messages: Vec<String>,
}

impl CrawlOutcome {
    pub fn average_score(&self) -> Option<f64> {
        if self.pages.is_empty() {
            return None;
        }
        let total: u32 = self.pages.iter().map(|p| p.score as u32).sum();
        Some(total as f64 / self.pages.len() as f64)
    }
}

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// 100, minus 10/5/1 per error/warning/info finding, minus 2 for each
/// missing site file when `site_files` is given. Clamped to 0..=100.
pub fn score_page(findings: &[Finding], site_files: Option<&SiteFilesReport>) -> u8 {
    let mut score: i32 = 100;

    for finding in findings {
        score -= match finding.kind {
            FindingKind::Error => ERROR_PENALTY,
            FindingKind::Warning => WARNING_PENALTY,
            FindingKind::Info => INFO_PENALTY,
            FindingKind::Recommendation => 0,
        };
    }

    if let Some(report) = site_files {
        if !report.robots_txt_exists() {
            score -= MISSING_SITE_FILE_PENALTY;
        }
        if !report.sitemap_xml_exists() {
            score -= MISSING_SITE_FILE_PENALTY;
        }
    }

    score.clamp(0, 100) as u8
}

/// Sequential, budget-bounded crawl of one site.
pub struct SiteCrawler {
    fetcher: PageFetcher,
    site_files: SiteFileChecker,
    progress_callback: Option<CrawlProgressCallback>,
}

impl SiteCrawler {
    pub fn new() -> Result<Self, CrawlError> {
        Ok(Self {
            fetcher: PageFetcher::new()?,
            site_files: SiteFileChecker::new()?,
            progress_callback: None,
        })
    }

    pub fn with_progress_callback(mut self, callback: CrawlProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn report_progress(&self, message: String) {
        if let Some(ref callback) = self.progress_callback {
            callback(message);
        }
    }

    /// Run one job to a terminal state.
    ///
    /// Fetch failures skip the page. Storage failures abort the job.
    pub async fn run(
        &self,
        job: &CrawlJob,
        store: &dyn AnalysisStore,
        recommender: &dyn RecommendationProvider,
    ) -> Result<CrawlOutcome, CrawlError> {
        let domain = job
            .domain()
            .ok_or_else(|| CrawlError::InvalidSeed(job.seed_url.clone()))?;
        let discoverer = LinkDiscoverer::new(domain);
        let budget = job.page_budget.max(1) as usize;

        let job_id = store.create_job(job)?;
        info!(
            "Job {} started: {} ({}, budget {})",
            job_id,
            job.seed_url,
            job.scope.as_str(),
            budget
        );

        let mut frontier = Frontier::with_seed(job.seed_url.clone());
        let mut pages = Vec::new();
        let mut messages = Vec::new();
        let mut skipped = 0;

        while frontier.visited_len() < budget {
            let Some(url) = frontier.pop() else {
                break;
            };
            if frontier.is_visited(&url) {
                continue;
            }

            self.report_progress(format!(
                "Analysing {} ({}/{})",
                url,
                frontier.visited_len() + 1,
                budget
            ));

            let (status_code, analysis) = match self.fetch_and_analyze(&url).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!("Skipping {}: {}", url, e);
                    messages.push(format!("Skipped {}: {}", url, e));
                    skipped += 1;
                    frontier.mark_visited(&url);
                    continue;
                }
            };

            let is_seed = url == job.seed_url;
            let site_files = if is_seed {
                self.check_site_files(&url).await
            } else {
                None
            };

            let bundle = self
                .build_bundle(job, &url, status_code, &analysis, site_files.as_ref(), is_seed, recommender)
                .await;

            let page_id = match store.save_page(&job_id, &bundle) {
                Ok(id) => id,
                Err(e) => {
                    let message = format!("Could not store {}: {}", url, e);
                    if let Err(finish_error) = store.finish_job(&job_id, JobState::Failed, Some(&message)) {
                        warn!("Could not mark job {} failed: {}", job_id, finish_error);
                    }
                    return Err(e.into());
                }
            };

            pages.push(PageSummary {
                page_id,
                url: url.clone(),
                status_code,
                score: bundle.record.score,
                finding_count: bundle
                    .findings
                    .iter()
                    .filter(|f| f.kind != FindingKind::Recommendation)
                    .count(),
                is_seed,
            });

            if job.scope == CrawlScope::MultiplePages && frontier.known_len() < budget {
                for link in discoverer.discover(&analysis.links, &frontier) {
                    if frontier.known_len() >= budget {
                        break;
                    }
                    debug!("Queued {}", link);
                    frontier.push(link);
                }
            }

            frontier.mark_visited(&url);
        }

        let (state, message) = if pages.is_empty() {
            let message = format!("Could not analyse the seed URL {}", job.seed_url);
            messages.push(message.clone());
            (JobState::Failed, Some(message))
        } else {
            (JobState::Completed, None)
        };

        store.finish_job(&job_id, state, message.as_deref())?;
        info!(
            "Job {} {}: {} page(s) analysed, {} skipped",
            job_id,
            state,
            pages.len(),
            skipped
        );

        Ok(CrawlOutcome {
            job_id,
            state,
            pages,
            visited: frontier.visited_len(),
            skipped,
            messages,
        })
    }

    async fn fetch_and_analyze(&self, url: &str) -> Result<(u16, PageAnalysis), ScanError> {
        let page = self.fetcher.fetch_page(url).await?;
        let analysis = analyze_html(&page.body, url)?;
        Ok((page.status_code, analysis))
    }

    async fn check_site_files(&self, url: &str) -> Option<SiteFilesReport> {
        match self.site_files.check(url).await {
            Ok(report) => Some(report),
            Err(e) => {
                warn!("Site file check failed for {}: {}", url, e);
                None
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn build_bundle(
        &self,
        job: &CrawlJob,
        url: &str,
        status_code: u16,
        analysis: &PageAnalysis,
        site_files: Option<&SiteFilesReport>,
        is_seed: bool,
        recommender: &dyn RecommendationProvider,
    ) -> PageBundle {
        let mut observed = analysis.findings.clone();
        if let Some(report) = site_files {
            observed.extend(report.findings.iter().cloned());
        }

        let score = score_page(&observed, site_files);
        let technology = job.technology.map(|t| t.label());

        let mut findings = Vec::with_capacity(observed.len() * 2);
        for finding in observed {
            let text = recommender
                .generate(&RecommendationRequest {
                    finding_description: &finding.description,
                    finding_kind: finding.kind,
                    page_url: url,
                    technology,
                })
                .await;
            findings.push(finding);
            findings.push(Finding::new(FindingKind::Recommendation, text));
        }

        PageBundle {
            record: PageRecord {
                url: url.to_string(),
                status_code,
                title: analysis.title.clone().unwrap_or_else(|| url.to_string()),
                meta_description: analysis.meta_description.clone(),
                score,
                is_seed,
                robots_txt: site_files.map(|r| r.robots_txt_exists()),
                sitemap_xml: site_files.map(|r| r.sitemap_xml_exists()),
            },
            findings,
            images: analysis.images.clone(),
            links: analysis.links.clone(),
        }
    }
}

/// Execute a crawl with the given options
/// Returns the crawl outcome
pub async fn execute_crawl(
    options: CrawlOptions,
    store: &dyn AnalysisStore,
    recommender: &dyn RecommendationProvider,
    progress_callback: Option<CrawlProgressCallback>,
) -> Result<CrawlOutcome, CrawlError> {
    let CrawlOptions {
        job,
        show_progress_bars,
    } = options;

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Starting crawl...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let pb_clone = progress_bar.clone();
    let internal_progress_callback: CrawlProgressCallback = Arc::new(move |message: String| {
        if let Some(ref pb) = pb_clone {
            pb.set_message(message.clone());
            pb.tick();
        }
        if let Some(ref callback) = progress_callback {
            callback(message);
        }
    });

    let crawler = SiteCrawler::new()?.with_progress_callback(internal_progress_callback);
    let outcome = crawler.run(&job, store, recommender).await;

    if let Some(ref pb) = progress_bar {
        match &outcome {
            Ok(outcome) => pb.finish_with_message(format!(
                "Crawl {}! {} page(s) analysed",
                outcome.state,
                outcome.pages.len()
            )),
            Err(e) => pb.abandon_with_message(format!("Crawl aborted: {}", e)),
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use seoprobe_scanner::site_files::ProbeStatus;

    fn findings(errors: usize, warnings: usize, infos: usize) -> Vec<Finding> {
        let mut out = Vec::new();
        out.extend((0..errors).map(|_| Finding::error("e")));
        out.extend((0..warnings).map(|_| Finding::warning("w")));
        out.extend((0..infos).map(|_| Finding::info("i")));
        out
    }

    fn site_report(robots: bool, sitemap: bool) -> SiteFilesReport {
        let status = |found| {
            if found {
                ProbeStatus::Found
            } else {
                ProbeStatus::Missing { status: 404 }
            }
        };
        SiteFilesReport {
            robots: status(robots),
            sitemap: status(sitemap),
            findings: Vec::new(),
        }
    }

    #[test]
    fn test_score_penalties_by_kind() {
        assert_eq!(score_page(&[], None), 100);
        assert_eq!(score_page(&findings(1, 1, 1), None), 84);
        assert_eq!(score_page(&findings(2, 0, 3), None), 77);
    }

    #[test]
    fn test_recommendations_do_not_cost_points() {
        let mut list = findings(1, 0, 0);
        list.push(Finding::new(FindingKind::Recommendation, "fix it"));
        assert_eq!(score_page(&list, None), 90);
    }

    #[test]
    fn test_missing_site_files_cost_two_each() {
        assert_eq!(score_page(&[], Some(&site_report(true, true))), 100);
        assert_eq!(score_page(&[], Some(&site_report(false, true))), 98);
        assert_eq!(score_page(&[], Some(&site_report(false, false))), 96);
    }

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(score_page(&findings(15, 0, 0), Some(&site_report(false, false))), 0);
    }

    #[test]
    fn test_extract_url_path() {
        assert_eq!(extract_url_path("https://site.com"), "/");
        assert_eq!(extract_url_path("https://site.com/a/b?x=1"), "/a/b");
        assert_eq!(extract_url_path("not a url"), "not a url");
    }

    #[test]
    fn test_average_score() {
        let page = |score| PageSummary {
            page_id: 1,
            url: "https://site.com/".to_string(),
            status_code: 200,
            score,
            finding_count: 0,
            is_seed: false,
        };
        let mut outcome = CrawlOutcome {
            job_id: "j".to_string(),
            state: JobState::Completed,
            pages: vec![],
            visited: 0,
            skipped: 0,
            messages: vec![],
        };
        assert_eq!(outcome.average_score(), None);
        outcome.pages = vec![page(80), page(90)];
        assert_eq!(outcome.average_score(), Some(85.0));
    }
}
