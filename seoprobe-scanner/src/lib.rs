pub mod analyzer;
pub mod error;
pub mod fetcher;
pub mod frontier;
pub mod links;
pub mod result;
pub mod site_files;

pub use analyzer::{analyze_document, analyze_html};
pub use error::ScanError;
pub use fetcher::PageFetcher;
pub use frontier::Frontier;
pub use links::{LinkDiscoverer, normalize_url};
pub use result::{FetchedPage, Finding, FindingKind, ImageRef, LinkKind, LinkRef, PageAnalysis};
pub use site_files::{SiteFileChecker, SiteFilesReport};
