// Core structs: ListingRecord, fetch jobs/results, session summary and errors
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// One scraped car advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingRecord {
    pub title: String,
    pub price: String,
    pub year: String,
    pub km: String,
    pub transmission: String,
    pub fuel_type: String,
    pub url: String,
    /// Filled in by the session, never by the extractor.
    pub source_site: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFetchJob {
    pub url: String,
    pub timeout: Duration,
}

impl PageFetchJob {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

#[derive(Debug)]
pub enum PageResult {
    Success { url: String, content: String },
    Failure { url: String, cause: FetchError },
}

impl PageResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PageResult::Success { .. })
    }
}

/// Result of reading the pagination marker on the first page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaginationPlan {
    pub total_pages: u32,
    /// URLs of pages `2..=total_pages`, in page order.
    pub page_urls: Vec<String>,
}

impl PaginationPlan {
    pub fn into_jobs(self, timeout: Duration) -> Vec<PageFetchJob> {
        self.page_urls
            .into_iter()
            .map(|url| PageFetchJob::new(url, timeout))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The start page held no listings; nothing else was fetched.
    Empty,
    Completed,
}

#[derive(Debug, Clone)]
pub struct ScrapeSummary {
    pub site: String,
    pub found: usize,
    pub failed_pages: usize,
    pub total_pages: u32,
    pub outcome: SessionOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error for {url}: {cause}")]
    Transport { url: String, cause: String },
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("fetching {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
}

/// Card-level extraction failure. The card is skipped, the page goes on.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("card has no title")]
    MissingTitle,
    #[error("card has no detail link")]
    MissingUrl,
    #[error("expected {expected} attribute nodes, found {found}")]
    AttributeCount { expected: usize, found: usize },
}

/// Pagination marker problems. Always degrades to "no further pages".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanningError {
    #[error("pagination marker `{0}` not found")]
    MarkerMissing(String),
    #[error("pagination marker text {0:?} holds no number")]
    Unparsable(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("site {site}: invalid selector `{selector}`: {reason}")]
    Selector {
        site: String,
        selector: String,
        reason: String,
    },
    #[error("site {site}: invalid pattern `{pattern}`: {source}")]
    Pattern {
        site: String,
        pattern: String,
        source: regex::Error,
    },
    #[error("site {site}: page template `{template}` has no {{page}} placeholder")]
    Template { site: String, template: String },
    #[error("unknown site `{0}`")]
    UnknownSite(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("start page failed: {0}")]
    StartPage(#[source] FetchError),
    #[error("writing records failed: {0}")]
    Sink(#[from] StorageError),
}
