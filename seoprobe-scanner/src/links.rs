use crate::frontier::Frontier;
use crate::result::LinkRef;
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// Resolve an `href` against the page it was found on.
///
/// Empty, fragment-only and `javascript:` hrefs yield `None`; the
/// fragment of the resolved URL is kept.
pub fn resolve_href(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.to_ascii_lowercase().starts_with("javascript:")
    {
        return None;
    }

    base.join(href).ok()
}

/// Canonical form used for frontier bookkeeping: absolute, fragment
/// stripped, query preserved.
pub fn normalize_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

/// Proposes new same-domain URLs for the frontier.
pub struct LinkDiscoverer {
    domain: String,
}

impl LinkDiscoverer {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Returns the links of one page that stay on the job's domain and are
    /// neither visited nor queued yet, in document order, without duplicates.
    pub fn discover(&self, links: &[LinkRef], known: &Frontier) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for link in links {
            let Ok(mut url) = Url::parse(&link.url) else {
                continue;
            };
            if !matches!(url.scheme(), "http" | "https") {
                debug!("Skipping non-http link {}", link.url);
                continue;
            }
            if url.host_str() != Some(self.domain.as_str()) {
                debug!("Skipping cross-domain link {}", link.url);
                continue;
            }

            url.set_fragment(None);
            let candidate = url.to_string();
            if known.contains(&candidate) || !seen.insert(candidate.clone()) {
                continue;
            }
            found.push(candidate);
        }

        found
    }
}
