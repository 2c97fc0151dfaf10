// Crawl job submission: seed normalization, scope and page budget

use seoprobe_scanner::normalize_url;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use url::Url;

pub const DEFAULT_PAGE_BUDGET: u32 = 10;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum JobRequestError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("A page count is required when analysing multiple pages")]
    MissingPageCount,

    #[error("The number of pages must be at least 1")]
    InvalidPageCount,

    #[error("Unknown scope '{0}' (expected single_url or multiple_pages)")]
    UnknownScope(String),

    #[error("Unknown website technology '{0}'")]
    UnknownTechnology(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlScope {
    SingleUrl,
    MultiplePages,
}

impl CrawlScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlScope::SingleUrl => "single_url",
            CrawlScope::MultiplePages => "multiple_pages",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, JobRequestError> {
        match s.to_lowercase().as_str() {
            "single" | "single_url" => Ok(CrawlScope::SingleUrl),
            "multi" | "multiple" | "multiple_pages" => Ok(CrawlScope::MultiplePages),
            _ => Err(JobRequestError::UnknownScope(s.to_string())),
        }
    }
}

/// Website technology hint. Passed through to recommendations only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteTechnology {
    Generic,
    Wordpress,
    Shopify,
    Joomla,
    Drupal,
    Wix,
    Squarespace,
    Django,
    RubyOnRails,
    React,
    Angular,
    Vuejs,
}

impl SiteTechnology {
    pub const ALL: [SiteTechnology; 12] = [
        SiteTechnology::Generic,
        SiteTechnology::Wordpress,
        SiteTechnology::Shopify,
        SiteTechnology::Joomla,
        SiteTechnology::Drupal,
        SiteTechnology::Wix,
        SiteTechnology::Squarespace,
        SiteTechnology::Django,
        SiteTechnology::RubyOnRails,
        SiteTechnology::React,
        SiteTechnology::Angular,
        SiteTechnology::Vuejs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SiteTechnology::Generic => "generic",
            SiteTechnology::Wordpress => "wordpress",
            SiteTechnology::Shopify => "shopify",
            SiteTechnology::Joomla => "joomla",
            SiteTechnology::Drupal => "drupal",
            SiteTechnology::Wix => "wix",
            SiteTechnology::Squarespace => "squarespace",
            SiteTechnology::Django => "django",
            SiteTechnology::RubyOnRails => "ruby_on_rails",
            SiteTechnology::React => "react",
            SiteTechnology::Angular => "angular",
            SiteTechnology::Vuejs => "vuejs",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SiteTechnology::Generic => "Generic / Unknown",
            SiteTechnology::Wordpress => "WordPress",
            SiteTechnology::Shopify => "Shopify",
            SiteTechnology::Joomla => "Joomla",
            SiteTechnology::Drupal => "Drupal",
            SiteTechnology::Wix => "Wix",
            SiteTechnology::Squarespace => "Squarespace",
            SiteTechnology::Django => "Django",
            SiteTechnology::RubyOnRails => "Ruby on Rails",
            SiteTechnology::React => "React (SPA)",
            SiteTechnology::Angular => "Angular (SPA)",
            SiteTechnology::Vuejs => "Vue.js (SPA)",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, JobRequestError> {
        let wanted = s.trim().to_lowercase().replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|tech| tech.as_str() == wanted)
            .ok_or_else(|| JobRequestError::UnknownTechnology(s.to_string()))
    }
}

impl fmt::Display for SiteTechnology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle of a crawl job: `Idle -> Running -> {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Idle => "idle",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unvalidated submission, as it arrives from the command line.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub url: String,
    pub scope: CrawlScope,
    pub num_pages: Option<u32>,
    pub technology: Option<SiteTechnology>,
}

/// Validated, immutable description of one crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlJob {
    pub seed_url: String,
    pub scope: CrawlScope,
    pub page_budget: u32,
    pub technology: Option<SiteTechnology>,
}

impl CrawlJob {
    pub fn single(seed_url: &str) -> Result<Self, JobRequestError> {
        JobRequest {
            url: seed_url.to_string(),
            scope: CrawlScope::SingleUrl,
            num_pages: None,
            technology: None,
        }
        .into_job()
    }

    pub fn multiple(seed_url: &str, pages: u32) -> Result<Self, JobRequestError> {
        JobRequest {
            url: seed_url.to_string(),
            scope: CrawlScope::MultiplePages,
            num_pages: Some(pages),
            technology: None,
        }
        .into_job()
    }

    pub fn with_technology(mut self, technology: SiteTechnology) -> Self {
        self.technology = Some(technology);
        self
    }

    pub fn domain(&self) -> Option<String> {
        Url::parse(&self.seed_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
    }
}

impl JobRequest {
    pub fn into_job(self) -> Result<CrawlJob, JobRequestError> {
        let seed_url = normalize_seed(&self.url)?;

        let page_budget = match self.scope {
            CrawlScope::SingleUrl => 1,
            CrawlScope::MultiplePages => match self.num_pages {
                None => return Err(JobRequestError::MissingPageCount),
                Some(0) => return Err(JobRequestError::InvalidPageCount),
                Some(n) => n,
            },
        };

        Ok(CrawlJob {
            seed_url,
            scope: self.scope,
            page_budget,
            technology: self.technology,
        })
    }
}

/// Prefix bare hosts with `https://`, require a host, strip the fragment.
pub fn normalize_seed(input: &str) -> Result<String, JobRequestError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();
    let candidate = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed =
        Url::parse(&candidate).map_err(|e| JobRequestError::InvalidUrl(format!("{}: {}", input, e)))?;
    match parsed.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(JobRequestError::InvalidUrl(input.to_string())),
    }

    normalize_url(parsed.as_str()).ok_or_else(|| JobRequestError::InvalidUrl(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_host_gets_https() {
        assert_eq!(normalize_seed("example.com").unwrap(), "https://example.com/");
        assert_eq!(
            normalize_seed("http://example.com/a#b").unwrap(),
            "http://example.com/a"
        );
    }

    #[test]
    fn test_invalid_seed() {
        assert!(matches!(
            normalize_seed("not a valid url!!!"),
            Err(JobRequestError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_single_scope_forces_budget_one() {
        let job = JobRequest {
            url: "https://example.com".to_string(),
            scope: CrawlScope::SingleUrl,
            num_pages: Some(25),
            technology: Some(SiteTechnology::Wordpress),
        }
        .into_job()
        .unwrap();

        assert_eq!(job.page_budget, 1);
        assert_eq!(job.technology, Some(SiteTechnology::Wordpress));
        assert_eq!(job.domain().as_deref(), Some("example.com"));
    }

    #[test]
    fn test_multiple_scope_requires_page_count() {
        let request = |num_pages| JobRequest {
            url: "example.com".to_string(),
            scope: CrawlScope::MultiplePages,
            num_pages,
            technology: None,
        };

        assert_eq!(
            request(None).into_job().unwrap_err(),
            JobRequestError::MissingPageCount
        );
        assert_eq!(
            request(Some(0)).into_job().unwrap_err(),
            JobRequestError::InvalidPageCount
        );
        assert_eq!(request(Some(7)).into_job().unwrap().page_budget, 7);
    }

    #[test]
    fn test_scope_and_technology_parsing() {
        assert_eq!(CrawlScope::from_str("multi").unwrap(), CrawlScope::MultiplePages);
        assert_eq!(CrawlScope::from_str("single_url").unwrap(), CrawlScope::SingleUrl);
        assert!(CrawlScope::from_str("everything").is_err());

        assert_eq!(
            SiteTechnology::from_str("Ruby-on-Rails").unwrap(),
            SiteTechnology::RubyOnRails
        );
        assert_eq!(SiteTechnology::Vuejs.label(), "Vue.js (SPA)");
        assert!(SiteTechnology::from_str("cobol").is_err());
    }
}
