// Report generation from database

use crate::crawl::extract_url_path;
use crate::data::{Database, Result, StoreError};
use seoprobe_scanner::{Finding, FindingKind, LinkKind};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n";
const THIN_RULE: &str = "────────────────────────────────────────────────────────────────────────────────\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportData {
    pub job: JobInfo,
    pub total_pages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_score: Option<f64>,
    pub finding_counts: FindingCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub robots_txt: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sitemap_xml: Option<bool>,
    pub pages: Vec<PageReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub id: String,
    pub seed_url: String,
    pub scope: String,
    pub page_budget: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub start_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingCounts {
    pub error: i64,
    pub warning: i64,
    pub info: i64,
    pub recommendation: i64,
}

impl FindingCounts {
    /// Observations only; recommendations are derived from them.
    pub fn total_issues(&self) -> i64 {
        self.error + self.warning + self.info
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageReport {
    pub url: String,
    pub status_code: u16,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta_description: Option<String>,
    pub score: u8,
    pub is_seed: bool,
    pub image_count: usize,
    pub images_missing_alt: usize,
    pub internal_links: usize,
    pub external_links: usize,
    pub findings: Vec<FindingEntry>,
}

/// A finding with the recommendation generated for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingEntry {
    pub kind: FindingKind,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// Attach each recommendation to the observation stored right before it.
pub fn pair_findings(findings: Vec<Finding>) -> Vec<FindingEntry> {
    let mut entries: Vec<FindingEntry> = Vec::new();

    for finding in findings {
        match finding.kind {
            FindingKind::Recommendation => match entries.last_mut() {
                Some(entry) if entry.recommendation.is_none() => {
                    entry.recommendation = Some(finding.description);
                }
                _ => entries.push(FindingEntry {
                    kind: finding.kind,
                    description: finding.description,
                    recommendation: None,
                }),
            },
            kind => entries.push(FindingEntry {
                kind,
                description: finding.description,
                recommendation: None,
            }),
        }
    }

    entries
}

pub fn gather_report_data(db: &Database, job_id: &str) -> Result<ReportData> {
    let job = db
        .get_job(job_id)?
        .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))?;

    let mut finding_counts = FindingCounts::default();
    for (kind, count) in db.get_finding_counts_by_kind(job_id)? {
        match FindingKind::from_str(&kind) {
            Some(FindingKind::Error) => finding_counts.error = count,
            Some(FindingKind::Warning) => finding_counts.warning = count,
            Some(FindingKind::Info) => finding_counts.info = count,
            Some(FindingKind::Recommendation) => finding_counts.recommendation = count,
            None => {}
        }
    }

    let stored_pages = db.get_pages_by_job(job_id)?;
    let mut pages = Vec::with_capacity(stored_pages.len());
    let mut robots_txt = None;
    let mut sitemap_xml = None;

    for stored in stored_pages {
        let record = stored.record;
        if record.is_seed {
            robots_txt = record.robots_txt;
            sitemap_xml = record.sitemap_xml;
        }

        let images = db.get_images_by_page(stored.id)?;
        let links = db.get_links_by_page(stored.id)?;
        let findings = pair_findings(db.get_findings_by_page(stored.id)?);

        pages.push(PageReport {
            url: record.url,
            status_code: record.status_code,
            title: record.title,
            meta_description: record.meta_description,
            score: record.score,
            is_seed: record.is_seed,
            image_count: images.len(),
            images_missing_alt: images.iter().filter(|i| i.alt.trim().is_empty()).count(),
            internal_links: links.iter().filter(|l| l.kind == LinkKind::Internal).count(),
            external_links: links.iter().filter(|l| l.kind == LinkKind::External).count(),
            findings,
        });
    }

    let average_score = if pages.is_empty() {
        None
    } else {
        let total: u32 = pages.iter().map(|p| p.score as u32).sum();
        Some(total as f64 / pages.len() as f64)
    };

    Ok(ReportData {
        job: JobInfo {
            id: job.id,
            seed_url: job.seed_url,
            scope: job.scope,
            page_budget: job.page_budget,
            technology: job.technology,
            status: job.status,
            message: job.message,
            start_time: job.start_time,
            end_time: job.end_time,
        },
        total_pages: pages.len(),
        average_score,
        finding_counts,
        robots_txt,
        sitemap_xml,
        pages,
    })
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    // Header
    report.push_str(RULE);
    report.push_str("                          SEOPROBE SITE AUDIT REPORT\n");
    report.push_str(RULE);
    report.push('\n');

    report.push_str(&format!("Job ID:       {}\n", data.job.id));
    report.push_str(&format!("Status:       {}\n", data.status_to_string()));
    report.push_str(&format!("Audit Date:   {}\n", format_timestamp(data.job.start_time)));
    if let Some(end_time) = data.job.end_time {
        report.push_str(&format!("Duration:     {} seconds\n", end_time - data.job.start_time));
    }
    report.push_str(&format!("Seed URL:     {}\n", data.job.seed_url));
    report.push_str(&format!(
        "Scope:        {} (budget {})\n",
        data.job.scope.replace('_', " "),
        data.job.page_budget
    ));
    if let Some(ref technology) = data.job.technology {
        report.push_str(&format!("Technology:   {}\n", technology));
    }
    if let Some(ref message) = data.job.message {
        report.push_str(&format!("Message:      {}\n", message));
    }
    report.push('\n');

    // Summary
    report.push_str(RULE);
    report.push_str("SUMMARY\n");
    report.push_str(RULE);
    report.push('\n');

    report.push_str(&format!("Pages analysed:  {}\n", data.total_pages));
    match data.average_score {
        Some(avg) => report.push_str(&format!("Average score:   {:.1}/100\n", avg)),
        None => report.push_str("Average score:   n/a\n"),
    }
    report.push_str(&format!("robots.txt:      {}\n", presence(data.robots_txt)));
    report.push_str(&format!("sitemap.xml:     {}\n", presence(data.sitemap_xml)));
    report.push('\n');

    report.push_str(&format!("Total Issues: {}\n\n", data.finding_counts.total_issues()));
    if data.finding_counts.error > 0 {
        report.push_str(&format!("  [ERROR]    {}  (Fix first)\n", data.finding_counts.error));
    }
    if data.finding_counts.warning > 0 {
        report.push_str(&format!("  [WARNING]  {}  (Should be addressed)\n", data.finding_counts.warning));
    }
    if data.finding_counts.info > 0 {
        report.push_str(&format!("  [INFO]     {}  (Informational)\n", data.finding_counts.info));
    }
    report.push('\n');

    if !data.pages.is_empty() {
        report.push_str("Score  Status  Page\n");
        for page in &data.pages {
            let marker = if page.is_seed { " (seed)" } else { "" };
            report.push_str(&format!(
                "{:>5}  {:>6}  {}{}\n",
                page.score,
                page.status_code,
                extract_url_path(&page.url),
                marker
            ));
        }
        report.push('\n');
    }

    // Per-page detail
    for page in &data.pages {
        report.push_str(RULE);
        report.push_str(&format!("{}\n", page.url));
        report.push_str(RULE);
        report.push('\n');

        report.push_str(&format!("Title:        {}\n", page.title));
        report.push_str(&format!(
            "Description:  {}\n",
            page.meta_description.as_deref().unwrap_or("(none)")
        ));
        report.push_str(&format!("Score:        {}/100\n", page.score));
        report.push_str(&format!(
            "Images:       {} ({} missing alt text)\n",
            page.image_count, page.images_missing_alt
        ));
        report.push_str(&format!(
            "Links:        {} internal, {} external\n\n",
            page.internal_links, page.external_links
        ));

        for (idx, finding) in page.findings.iter().enumerate() {
            report.push_str(&format!("[{}] {}\n", idx + 1, finding.kind.as_str().to_uppercase()));
            report.push_str(&wrap_text(&finding.description, 80, "  "));
            if let Some(ref recommendation) = finding.recommendation {
                report.push_str("\nRecommendation:\n");
                report.push_str(&wrap_text(recommendation, 80, "  "));
            }
            report.push('\n');
            report.push_str(THIN_RULE);
            report.push('\n');
        }
    }

    // Footer
    report.push_str(RULE);
    report.push_str("                                End of Report\n");
    report.push_str(RULE);
    report.push_str("\nGenerated by seoprobe - an on-page SEO auditor\n\n");

    report
}

pub fn generate_json_report(data: &ReportData) -> std::result::Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "seoprobe",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "job": {
                "id": data.job.id,
                "status": data.job.status,
                "message": data.job.message,
                "seed_url": data.job.seed_url,
                "scope": data.job.scope,
                "page_budget": data.job.page_budget,
                "technology": data.job.technology,
                "start_time": format_iso8601_timestamp(data.job.start_time),
                "end_time": data.job.end_time.map(format_iso8601_timestamp),
                "duration_seconds": data.job.end_time.map(|end| end - data.job.start_time)
            },
            "summary": {
                "total_pages": data.total_pages,
                "average_score": data.average_score,
                "robots_txt": data.robots_txt,
                "sitemap_xml": data.sitemap_xml,
                "total_issues": data.finding_counts.total_issues(),
                "finding_breakdown": data.finding_counts
            },
            "pages": data.pages
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

// Helper functions
impl ReportData {
    fn status_to_string(&self) -> &str {
        match self.job.status.as_str() {
            "completed" => "Completed",
            "failed" => "Failed",
            "running" => "Running",
            "idle" => "Idle",
            _ => "Unknown",
        }
    }
}

fn presence(flag: Option<bool>) -> &'static str {
    match flag {
        Some(true) => "present",
        Some(false) => "missing",
        None => "not checked",
    }
}

fn format_timestamp(timestamp: i64) -> String {
    use chrono::{DateTime, Utc};
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn format_iso8601_timestamp(timestamp: i64) -> String {
    use chrono::{DateTime, Utc};
    let datetime = DateTime::<Utc>::from_timestamp(timestamp, 0).unwrap_or_else(Utc::now);
    datetime.to_rfc3339()
}

pub fn wrap_text(text: &str, width: usize, indent: &str) -> String {
    let mut result = String::new();
    let mut current_line = String::new();
    let available = width.saturating_sub(indent.len()).max(1);

    for word in text.split_whitespace() {
        if !current_line.is_empty() && current_line.len() + word.len() + 1 > available {
            result.push_str(indent);
            result.push_str(&current_line);
            result.push('\n');
            current_line.clear();
        }

        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }

    if !current_line.is_empty() {
        result.push_str(indent);
        result.push_str(&current_line);
        result.push('\n');
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_findings_attaches_recommendations() {
        let entries = pair_findings(vec![
            Finding::error("No H1 heading found."),
            Finding::new(FindingKind::Recommendation, "Add one H1."),
            Finding::info("No external links."),
            Finding::new(FindingKind::Recommendation, "Link out."),
        ]);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, FindingKind::Error);
        assert_eq!(entries[0].recommendation.as_deref(), Some("Add one H1."));
        assert_eq!(entries[1].recommendation.as_deref(), Some("Link out."));
    }

    #[test]
    fn test_pair_findings_keeps_orphans() {
        let entries = pair_findings(vec![
            Finding::new(FindingKind::Recommendation, "stray"),
            Finding::warning("short title"),
        ]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, FindingKind::Recommendation);
        assert!(entries[1].recommendation.is_none());
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let wrapped = wrap_text(text, 20, "  ");
        assert!(wrapped.lines().count() > 1);
        assert!(wrapped.lines().all(|l| l.len() <= 20 && l.starts_with("  ")));
    }

    #[test]
    fn test_report_format_parsing() {
        assert_eq!(ReportFormat::from_str("JSON"), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::from_str("text"), Some(ReportFormat::Text));
        assert_eq!(ReportFormat::from_str("csv"), None);
    }
}
