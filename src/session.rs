// One single-pass scrape of one site: start page, plan, fan out, extract, persist
use crate::config::SiteConfig;
use crate::model::{
    ConfigError, FetchError, ListingRecord, PageResult, PaginationPlan, ScrapeSummary,
    SessionError, SessionOutcome,
};
use crate::parser::{ListingExtractor, PaginationPlanner};
use crate::fetch::{FetchPool, PageFetcher};
use crate::storage::ListingSink;
use chrono::Utc;
use scraper::Html;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// A site's configuration with every selector and pattern compiled.
pub struct SiteProfile {
    pub name: String,
    pub start_url: String,
    extractor: ListingExtractor,
    planner: PaginationPlanner,
}

impl SiteProfile {
    pub fn from_config(site: &SiteConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            name: site.name.clone(),
            start_url: site.start_url.clone(),
            extractor: ListingExtractor::from_config(
                &site.name,
                &site.listing,
                site.link_base.clone(),
            )?,
            planner: PaginationPlanner::from_config(site)?,
        })
    }

    /// Records of the start page, plus the follow-up plan when there were any.
    fn read_start_page(&self, html: &str) -> (Vec<ListingRecord>, PaginationPlan) {
        let document = Html::parse_document(html);
        let records = self.tagged(self.extractor.extract(&document).collect());
        if records.is_empty() {
            return (records, PaginationPlan::default());
        }
        let plan = self.planner.plan(&document);
        (records, plan)
    }

    fn read_page(&self, html: &str) -> Vec<ListingRecord> {
        self.tagged(self.extractor.extract_page(html))
    }

    fn tagged(&self, mut records: Vec<ListingRecord>) -> Vec<ListingRecord> {
        for record in records.iter_mut() {
            record.source_site = self.name.clone();
        }
        records
    }
}

pub struct ScrapeSession {
    fetcher: Arc<dyn PageFetcher>,
    pool: FetchPool,
    request_timeout: Duration,
    debug_html_dir: Option<PathBuf>,
}

impl ScrapeSession {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        concurrency: usize,
        request_timeout: Duration,
    ) -> Self {
        Self {
            pool: FetchPool::new(Arc::clone(&fetcher), concurrency),
            fetcher,
            request_timeout,
            debug_html_dir: None,
        }
    }

    /// Start pages without listings are saved here for selector debugging.
    pub fn with_debug_html_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_html_dir = Some(dir.into());
        self
    }

    /// Scrapes `site` and hands every record to `sink` in one batch.
    /// Only a failed start page is an error; lost follow-up pages are counted.
    pub async fn run(
        &self,
        site: &SiteProfile,
        sink: &mut dyn ListingSink,
    ) -> Result<ScrapeSummary, SessionError> {
        let started_at = Utc::now();
        info!("Scraping {} from {}", site.name, site.start_url);

        let start_fetch = self.fetcher.fetch(&site.start_url);
        let home = match timeout(self.request_timeout, start_fetch).await {
            Ok(Ok(html)) => html,
            Ok(Err(e)) => {
                error!("Start page of {} failed, aborting: {}", site.name, e);
                return Err(SessionError::StartPage(e));
            }
            Err(_) => {
                let e = FetchError::Timeout {
                    url: site.start_url.clone(),
                    timeout: self.request_timeout,
                };
                error!("Start page of {} failed, aborting: {}", site.name, e);
                return Err(SessionError::StartPage(e));
            }
        };

        let (mut records, plan) = site.read_start_page(&home);
        if records.is_empty() {
            info!("No cars found on {}", site.name);
            if let Some(dir) = &self.debug_html_dir {
                save_debug_html(dir, &site.name, &home);
            }
            sink.write_all(&records)?;
            return Ok(ScrapeSummary {
                site: site.name.clone(),
                found: 0,
                failed_pages: 0,
                total_pages: 0,
                outcome: SessionOutcome::Empty,
                started_at,
                finished_at: Utc::now(),
            });
        }
        info!("Found {} cars on the start page", records.len());

        let total_pages = plan.total_pages;
        let results = self.pool.fetch_all(plan.into_jobs(self.request_timeout)).await;

        let mut failed_pages = 0;
        for result in results {
            match result {
                PageResult::Success { url, content } => {
                    let page = site.read_page(&content);
                    debug!("{} cars on {}", page.len(), url);
                    records.extend(page);
                }
                PageResult::Failure { url, cause } => {
                    debug!("Dropping page {}: {}", url, cause);
                    failed_pages += 1;
                }
            }
        }

        sink.write_all(&records)?;

        let finished_at = Utc::now();
        info!(
            "Finished {}: {} cars, {} of {} pages failed, took {}s",
            site.name,
            records.len(),
            failed_pages,
            total_pages,
            (finished_at - started_at).num_seconds()
        );

        Ok(ScrapeSummary {
            site: site.name.clone(),
            found: records.len(),
            failed_pages,
            total_pages,
            outcome: SessionOutcome::Completed,
            started_at,
            finished_at,
        })
    }
}

/// Saves the provided HTML for debugging purposes.
fn save_debug_html(folder: &Path, site: &str, html: &str) {
    if let Err(e) = fs::create_dir_all(folder) {
        warn!("Failed to create debug folder: {}", e);
        return;
    }
    let filename = folder.join(format!("debug-{}.html", site.replace(' ', "_")));
    if let Err(e) = fs::write(&filename, html) {
        warn!("Failed to write debug HTML: {}", e);
    } else {
        info!("Saved debug HTML: {}", filename.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const SITE: &str = r#"{
        "name": "testsite",
        "start_url": "https://cars.example/list",
        "page_url_template": "https://cars.example/list?page={page}",
        "link_base": "https://cars.example",
        "pagination": { "kind": "result_count", "selector": "div.count" },
        "listing": {
            "card": "div.card",
            "title": ["h3"],
            "price": "span.price",
            "km": "i.km"
        }
    }"#;

    enum Reply {
        Page(String),
        Hang,
        NotFound,
    }

    struct FakeSite {
        pages: HashMap<String, Reply>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeSite {
        fn new(pages: Vec<(String, Reply)>) -> Arc<Self> {
            Arc::new(Self {
                pages: pages.into_iter().collect(),
                requested: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl PageFetcher for FakeSite {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.pages.get(url) {
                Some(Reply::Page(html)) => Ok(html.clone()),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(String::new())
                }
                Some(Reply::NotFound) | None => Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }

    fn page_url(page: u32) -> String {
        format!("https://cars.example/list?page={}", page)
    }

    fn results_page(cards: usize, untitled: usize, marker: Option<&str>) -> String {
        let mut html = String::from("<html><body>");
        if let Some(marker) = marker {
            html.push_str(&format!(r#"<div class="count">{}</div>"#, marker));
        }
        for i in 0..cards {
            let title = if i < untitled { String::new() } else { format!("Car {}", i) };
            html.push_str(&format!(
                r#"<div class="card"><a href="/car/{i}"><h3>{title}</h3></a>
                   <span class="price">R {i}00 000</span><i class="km">{i}0&nbsp;000 km</i></div>"#
            ));
        }
        html.push_str("</body></html>");
        html
    }

    fn session(fetcher: Arc<FakeSite>) -> ScrapeSession {
        ScrapeSession::new(fetcher, 17, Duration::from_secs(60))
    }

    fn profile() -> SiteProfile {
        let config: SiteConfig = serde_json::from_str(SITE).unwrap();
        SiteProfile::from_config(&config).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn partial_failure_still_persists_every_other_page() {
        let fetcher = FakeSite::new(vec![
            (
                "https://cars.example/list".to_string(),
                Reply::Page(results_page(24, 1, Some("100 results"))),
            ),
            (page_url(2), Reply::Page(results_page(20, 0, None))),
            (page_url(3), Reply::Hang),
            (page_url(4), Reply::Page(results_page(20, 0, None))),
            (page_url(5), Reply::Page(results_page(20, 0, None))),
            (page_url(6), Reply::Page(results_page(3, 0, None))),
        ]);
        let mut sink: Vec<ListingRecord> = Vec::new();

        let summary = session(fetcher.clone())
            .run(&profile(), &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.outcome, SessionOutcome::Completed);
        assert_eq!(summary.total_pages, 6);
        assert_eq!(summary.failed_pages, 1);
        assert_eq!(summary.found, 23 + 20 + 20 + 20 + 3);
        assert_eq!(sink.len(), summary.found);
        assert_eq!(fetcher.requested.lock().unwrap().len(), 6);

        let first = &sink[0];
        assert_eq!(first.title, "Car 1");
        assert_eq!(first.url, "https://cars.example/car/1");
        assert_eq!(first.km, "10 000 km");
        assert!(sink.iter().all(|r| r.source_site == "testsite"));
        assert!(sink.iter().all(|r| !r.title.is_empty() && !r.url.is_empty()));
    }

    #[tokio::test]
    async fn failed_start_page_aborts_without_output() {
        let fetcher = FakeSite::new(vec![(
            "https://cars.example/list".to_string(),
            Reply::NotFound,
        )]);
        let mut sink: Vec<ListingRecord> = Vec::new();

        let result = session(fetcher).run(&profile(), &mut sink).await;

        assert!(matches!(
            result,
            Err(SessionError::StartPage(FetchError::Status { status: 404, .. }))
        ));
        assert!(sink.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_start_page_aborts_after_timeout() {
        let fetcher = FakeSite::new(vec![(
            "https://cars.example/list".to_string(),
            Reply::Hang,
        )]);
        let mut sink: Vec<ListingRecord> = Vec::new();

        let result = session(fetcher).run(&profile(), &mut sink).await;

        assert!(matches!(
            result,
            Err(SessionError::StartPage(FetchError::Timeout { .. }))
        ));
    }

    #[tokio::test]
    async fn empty_start_page_stops_before_planning() {
        let fetcher = FakeSite::new(vec![(
            "https://cars.example/list".to_string(),
            Reply::Page(results_page(0, 0, Some("340 results"))),
        )]);
        let mut sink: Vec<ListingRecord> = Vec::new();

        let summary = session(fetcher.clone())
            .run(&profile(), &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.outcome, SessionOutcome::Empty);
        assert_eq!(summary.found, 0);
        assert_eq!(fetcher.requested.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_start_page_is_saved_for_debugging() {
        let dir = tempfile::tempdir().unwrap();
        let html = results_page(0, 0, None);
        let fetcher = FakeSite::new(vec![(
            "https://cars.example/list".to_string(),
            Reply::Page(html.clone()),
        )]);
        let mut sink: Vec<ListingRecord> = Vec::new();

        session(fetcher)
            .with_debug_html_dir(dir.path())
            .run(&profile(), &mut sink)
            .await
            .unwrap();

        let saved = fs::read_to_string(dir.path().join("debug-testsite.html")).unwrap();
        assert_eq!(saved, html);
    }

    #[tokio::test]
    async fn zero_results_marker_keeps_first_page_only() {
        let fetcher = FakeSite::new(vec![(
            "https://cars.example/list".to_string(),
            Reply::Page(results_page(4, 0, Some("0 results"))),
        )]);
        let mut sink: Vec<ListingRecord> = Vec::new();

        let summary = session(fetcher.clone())
            .run(&profile(), &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.total_pages, 0);
        assert_eq!(summary.found, 4);
        assert_eq!(summary.failed_pages, 0);
        assert_eq!(fetcher.requested.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_marker_keeps_first_page_only() {
        let fetcher = FakeSite::new(vec![(
            "https://cars.example/list".to_string(),
            Reply::Page(results_page(5, 0, None)),
        )]);
        let mut sink: Vec<ListingRecord> = Vec::new();

        let summary = session(fetcher).run(&profile(), &mut sink).await.unwrap();

        assert_eq!(summary.outcome, SessionOutcome::Completed);
        assert_eq!(summary.found, 5);
        assert_eq!(sink.len(), 5);
    }
}
