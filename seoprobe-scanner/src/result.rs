use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw response of one GET request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    pub url: String,
    pub status_code: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingKind {
    Error,
    Warning,
    Info,
    Recommendation,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::Error => "error",
            FindingKind::Warning => "warning",
            FindingKind::Info => "info",
            FindingKind::Recommendation => "recommendation",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "error" => Some(FindingKind::Error),
            "warning" => Some(FindingKind::Warning),
            "info" => Some(FindingKind::Info),
            "recommendation" => Some(FindingKind::Recommendation),
            _ => None,
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discrete SEO observation about a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub description: String,
}

impl Finding {
    pub fn new(kind: FindingKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self::new(FindingKind::Error, description)
    }

    pub fn warning(description: impl Into<String>) -> Self {
        Self::new(FindingKind::Warning, description)
    }

    pub fn info(description: impl Into<String>) -> Self {
        Self::new(FindingKind::Info, description)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub alt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Internal,
    External,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Internal => "internal",
            LinkKind::External => "external",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "internal" => Some(LinkKind::Internal),
            "external" => Some(LinkKind::External),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRef {
    pub url: String,
    pub text: String,
    pub kind: LinkKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Headings {
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub h3: Vec<String>,
}

/// Everything the content analyzer extracts from one HTML document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub headings: Headings,
    pub images: Vec<ImageRef>,
    pub links: Vec<LinkRef>,
    pub findings: Vec<Finding>,
}

impl PageAnalysis {
    pub fn internal_link_count(&self) -> usize {
        self.links
            .iter()
            .filter(|l| l.kind == LinkKind::Internal)
            .count()
    }

    pub fn external_link_count(&self) -> usize {
        self.links
            .iter()
            .filter(|l| l.kind == LinkKind::External)
            .count()
    }
}
