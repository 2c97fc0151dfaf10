//! On-page signal extraction and the per-field SEO rules.

use crate::error::{Result, ScanError};
use crate::links::resolve_href;
use crate::result::{Finding, Headings, ImageRef, LinkKind, LinkRef, PageAnalysis};
use scraper::{ElementRef, Html, Selector};
use url::Url;

pub const TITLE_MIN_LEN: usize = 10;
pub const TITLE_MAX_LEN: usize = 60;
pub const META_DESCRIPTION_MIN_LEN: usize = 50;
pub const META_DESCRIPTION_MAX_LEN: usize = 160;
pub const MIN_INTERNAL_LINKS: usize = 3;
pub const MIN_EXTERNAL_LINKS: usize = 1;

/// Parse `html` and analyze it as the page served at `page_url`.
pub fn analyze_html(html: &str, page_url: &str) -> Result<PageAnalysis> {
    let url = Url::parse(page_url)
        .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", page_url, e)))?;
    let document = Html::parse_document(html);
    Ok(analyze_document(&document, &url))
}

/// Extract title, description, headings, images and links, and derive the
/// findings. Malformed or missing markup only ever lands in the "absent"
/// branches.
pub fn analyze_document(document: &Html, page_url: &Url) -> PageAnalysis {
    let title = extract_first_text(document, "title");
    let meta_description = extract_meta_description(document);
    let headings = Headings {
        h1: extract_all_text(document, "h1"),
        h2: extract_all_text(document, "h2"),
        h3: extract_all_text(document, "h3"),
    };
    let images = extract_images(document, page_url);
    let links = extract_links(document, page_url);

    let mut findings = Vec::new();
    check_title(title.as_deref(), &mut findings);
    check_meta_description(meta_description.as_deref(), &mut findings);
    check_h1(&headings.h1, &mut findings);
    check_images(&images, &mut findings);
    check_links(&links, &mut findings);

    PageAnalysis {
        title,
        meta_description,
        headings,
        images,
        links,
        findings,
    }
}

fn check_title(title: Option<&str>, findings: &mut Vec<Finding>) {
    let Some(title) = title else {
        findings.push(Finding::error(
            "The page has no title. The title is crucial for SEO.",
        ));
        return;
    };

    let len = title.chars().count();
    if len < TITLE_MIN_LEN {
        findings.push(Finding::warning(format!(
            "The title is too short ({} characters). 50-60 characters are recommended.",
            len
        )));
    } else if len > TITLE_MAX_LEN {
        findings.push(Finding::info(format!(
            "The title is too long ({} characters). Shorten it to 50-60 characters.",
            len
        )));
    }
}

fn check_meta_description(description: Option<&str>, findings: &mut Vec<Finding>) {
    let Some(description) = description else {
        findings.push(Finding::error(
            "No meta description found. It is important for SEO.",
        ));
        return;
    };

    let len = description.chars().count();
    if len < META_DESCRIPTION_MIN_LEN {
        findings.push(Finding::warning(format!(
            "The meta description is too short ({} characters). 150-160 characters are recommended.",
            len
        )));
    } else if len > META_DESCRIPTION_MAX_LEN {
        findings.push(Finding::info(format!(
            "The meta description is too long ({} characters). Shorten it to 150-160 characters.",
            len
        )));
    }
}

fn check_h1(h1: &[String], findings: &mut Vec<Finding>) {
    match h1.len() {
        0 => findings.push(Finding::error(
            "No H1 heading found. Every page should have one H1.",
        )),
        1 => {}
        n => findings.push(Finding::warning(format!(
            "Multiple H1 headings found ({}). Use a single H1 per page.",
            n
        ))),
    }
}

fn check_images(images: &[ImageRef], findings: &mut Vec<Finding>) {
    for image in images.iter().filter(|img| img.alt.is_empty()) {
        findings.push(Finding::warning(format!(
            "Image missing alt text: {}",
            image.url
        )));
    }
}

fn check_links(links: &[LinkRef], findings: &mut Vec<Finding>) {
    let internal = links.iter().filter(|l| l.kind == LinkKind::Internal).count();
    let external = links.len() - internal;

    if internal < MIN_INTERNAL_LINKS {
        findings.push(Finding::warning(format!(
            "Few internal links ({}). More internal links improve navigation.",
            internal
        )));
    }
    if external < MIN_EXTERNAL_LINKS {
        findings.push(Finding::info(
            "No external links. Linking to authoritative sites can improve SEO.",
        ));
    }
}

fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: &ElementRef) -> String {
    normalize_text(&el.text().collect::<Vec<_>>().join(" "))
}

fn extract_first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| element_text(&el))
        .filter(|text| !text.is_empty())
}

fn extract_all_text(document: &Html, selector: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    document.select(&selector).map(|el| element_text(&el)).collect()
}

fn extract_meta_description(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name]").unwrap();
    document
        .select(&selector)
        .find(|el| {
            el.value()
                .attr("name")
                .is_some_and(|name| name.eq_ignore_ascii_case("description"))
        })
        .and_then(|el| el.value().attr("content"))
        .map(normalize_text)
        .filter(|content| !content.is_empty())
}

fn extract_images(document: &Html, page_url: &Url) -> Vec<ImageRef> {
    let selector = Selector::parse("img").unwrap();
    document
        .select(&selector)
        .filter_map(|el| {
            let src = el.value().attr("src")?.trim();
            if src.is_empty() {
                return None;
            }
            let url = page_url
                .join(src)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| src.to_string());
            let alt = el.value().attr("alt").map(normalize_text).unwrap_or_default();
            Some(ImageRef { url, alt })
        })
        .collect()
}

fn extract_links(document: &Html, page_url: &Url) -> Vec<LinkRef> {
    let selector = Selector::parse("a[href]").unwrap();
    let page_host = page_url.host_str();

    document
        .select(&selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            let resolved = resolve_href(page_url, href)?;
            let kind = if page_host.is_some() && resolved.host_str() == page_host {
                LinkKind::Internal
            } else {
                LinkKind::External
            };
            Some(LinkRef {
                url: resolved.to_string(),
                text: element_text(&el),
                kind,
            })
        })
        .collect()
}
