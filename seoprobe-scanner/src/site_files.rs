use crate::error::{Result, ScanError};
use crate::fetcher::{PageFetcher, SITE_FILE_TIMEOUT_SECS};
use crate::result::Finding;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteFile {
    Robots,
    Sitemap,
}

impl SiteFile {
    pub fn path(&self) -> &'static str {
        match self {
            SiteFile::Robots => "/robots.txt",
            SiteFile::Sitemap => "/sitemap.xml",
        }
    }

    pub fn name(&self) -> &'static str {
        &self.path()[1..]
    }
}

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbeStatus {
    /// 2xx with a non-blank body.
    Found,
    /// Answered, but non-2xx or blank.
    Missing { status: u16 },
    /// Transport failure.
    Unreachable { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteFilesReport {
    pub robots: ProbeStatus,
    pub sitemap: ProbeStatus,
    pub findings: Vec<Finding>,
}

impl SiteFilesReport {
    pub fn robots_txt_exists(&self) -> bool {
        self.robots == ProbeStatus::Found
    }

    pub fn sitemap_xml_exists(&self) -> bool {
        self.sitemap == ProbeStatus::Found
    }
}

/// Scheme + host (+ port) of any URL on a site.
pub fn site_base(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", url, e)))?;
    if parsed.host_str().is_none() {
        return Err(ScanError::InvalidUrl(format!("{}: missing host", url)));
    }
    let mut base = parsed;
    base.set_path("/");
    base.set_query(None);
    base.set_fragment(None);
    Ok(base)
}

/// Probes `/robots.txt` and `/sitemap.xml` at a site root.
#[derive(Clone)]
pub struct SiteFileChecker {
    fetcher: PageFetcher,
}

impl SiteFileChecker {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fetcher: PageFetcher::with_timeout(SITE_FILE_TIMEOUT_SECS)?,
        })
    }

    pub fn with_fetcher(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Run both probes against the site that `page_url` belongs to.
    pub async fn check(&self, page_url: &str) -> Result<SiteFilesReport> {
        let base = site_base(page_url)?;
        let mut findings = Vec::new();

        let robots = self.probe(&base, SiteFile::Robots, &mut findings).await;
        let sitemap = self.probe(&base, SiteFile::Sitemap, &mut findings).await;

        Ok(SiteFilesReport {
            robots,
            sitemap,
            findings,
        })
    }

    async fn probe(&self, base: &Url, file: SiteFile, findings: &mut Vec<Finding>) -> ProbeStatus {
        let target = match base.join(file.path()) {
            Ok(url) => url.to_string(),
            Err(e) => {
                return ProbeStatus::Unreachable {
                    error: e.to_string(),
                };
            }
        };

        match self.fetcher.get(&target).await {
            Ok(page) if page.is_success() && !page.body.trim().is_empty() => {
                debug!("{} present at {}", file.name(), target);
                ProbeStatus::Found
            }
            Ok(page) => {
                findings.push(Finding::info(format!(
                    "{} not found or empty (HTTP {}).",
                    file.name(),
                    page.status_code
                )));
                ProbeStatus::Missing {
                    status: page.status_code,
                }
            }
            Err(e) => {
                warn!("Could not fetch {}: {}", target, e);
                findings.push(Finding::warning(format!(
                    "Error accessing {}: {}",
                    target, e
                )));
                ProbeStatus::Unreachable {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::FindingKind;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    async fn mount(server: &MockServer, at: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn test_site_base_drops_path_query_fragment() {
        let base = site_base("https://site.com:8443/a/b?x=1#y").unwrap();
        assert_eq!(base.as_str(), "https://site.com:8443/");
        assert!(site_base("nonsense").is_err());
    }

    #[tokio::test]
    async fn test_both_files_present() {
        let server = MockServer::start().await;
        mount(&server, "/robots.txt", 200, "User-agent: *\nAllow: /\n").await;
        mount(&server, "/sitemap.xml", 200, "<urlset></urlset>").await;

        let checker = SiteFileChecker::new().unwrap();
        let report = checker
            .check(&format!("{}/deep/page", server.uri()))
            .await
            .unwrap();

        assert!(report.robots_txt_exists());
        assert!(report.sitemap_xml_exists());
        assert!(report.findings.is_empty());
    }

    #[tokio::test]
    async fn test_empty_robots_is_info_not_warning() {
        let server = MockServer::start().await;
        mount(&server, "/robots.txt", 200, "   \n").await;
        mount(&server, "/sitemap.xml", 200, "<urlset></urlset>").await;

        let checker = SiteFileChecker::new().unwrap();
        let report = checker.check(&server.uri()).await.unwrap();

        assert!(!report.robots_txt_exists());
        assert_eq!(report.robots, ProbeStatus::Missing { status: 200 });
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].kind, FindingKind::Info);
        assert!(report.findings[0].description.contains("not found or empty"));
    }

    #[tokio::test]
    async fn test_missing_sitemap_is_info() {
        let server = MockServer::start().await;
        mount(&server, "/robots.txt", 200, "User-agent: *").await;
        mount(&server, "/sitemap.xml", 404, "gone").await;

        let checker = SiteFileChecker::new().unwrap();
        let report = checker.check(&server.uri()).await.unwrap();

        assert!(report.robots_txt_exists());
        assert!(!report.sitemap_xml_exists());
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].kind, FindingKind::Info);
        assert!(report.findings[0].description.starts_with("sitemap.xml"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_warning() {
        let checker = SiteFileChecker::with_fetcher(PageFetcher::with_timeout(1).unwrap());
        let report = checker.check("http://127.0.0.1:9/").await.unwrap();

        assert!(!report.robots_txt_exists());
        assert!(matches!(report.robots, ProbeStatus::Unreachable { .. }));
        assert_eq!(report.findings.len(), 2);
        assert!(
            report
                .findings
                .iter()
                .all(|f| f.kind == FindingKind::Warning && f.description.starts_with("Error accessing"))
        );
    }
}
