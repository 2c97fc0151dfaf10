use crate::error::{Result, ScanError};
use crate::result::FetchedPage;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Timeout for content pages.
pub const PAGE_TIMEOUT_SECS: u64 = 10;
/// Timeout for robots.txt / sitemap.xml probes.
pub const SITE_FILE_TIMEOUT_SECS: u64 = 5;

const USER_AGENT: &str = "seoprobe/0.1 (https://github.com/trapdoorsec/seoprobe)";

/// Thin GET client with a fixed per-request timeout.
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(PAGE_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    /// Issue a GET and return whatever the server answered, any status.
    ///
    /// Only transport problems (DNS, connect, timeout, unreadable body)
    /// are errors here.
    pub async fn get(&self, url: &str) -> Result<FetchedPage> {
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await?;
        let status_code = response.status().as_u16();
        let body = response.text().await?;

        Ok(FetchedPage {
            url: url.to_string(),
            status_code,
            body,
        })
    }

    /// Fetch a content page. Non-2xx answers are raised as
    /// [`ScanError::HttpStatus`] so the caller can skip the URL.
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedPage> {
        let page = self.get(url).await?;
        if !page.is_success() {
            return Err(ScanError::HttpStatus {
                url: url.to_string(),
                status: page.status_code,
            });
        }
        Ok(page)
    }
}
