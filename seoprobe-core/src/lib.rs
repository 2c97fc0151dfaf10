pub mod crawl;
pub mod data;
pub mod job;
pub mod recommend;
pub mod report;

use colored::Colorize;

pub use crawl::{CrawlError, CrawlOptions, CrawlOutcome, SiteCrawler, execute_crawl, score_page};
pub use data::{AnalysisStore, Database, PageBundle, PageRecord, StoreError};
pub use job::{CrawlJob, CrawlScope, JobRequest, JobState, SiteTechnology};
pub use recommend::{GeminiProvider, RecommendationProvider, RecommendationRequest};

pub fn print_banner() {
    let banner = r#"
  ____  _____  ___   ____  ____   ___   ____  _____
 / ___|| ____|/ _ \ |  _ \|  _ \ / _ \ | __ )| ____|
 \___ \|  _| | | | || |_) | |_) | | | ||  _ \|  _|
  ___) | |___| |_| ||  __/|  _ <| |_| || |_) | |___
 |____/|_____|\___/ |_|   |_| \_\\___/ |____/|_____|
"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "on-page SEO auditor".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
