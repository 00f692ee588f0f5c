// Bounded concurrent page fetching with per-task timeouts
use super::traits::PageFetcher;
use crate::model::{FetchError, PageFetchJob, PageResult};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{info, warn};

/// Runs fetch jobs with at most `concurrency` in flight. Every job yields
/// exactly one [`PageResult`]; results come back in completion order.
pub struct FetchPool {
    fetcher: Arc<dyn PageFetcher>,
    concurrency: usize,
}

impl FetchPool {
    pub fn new(fetcher: Arc<dyn PageFetcher>, concurrency: usize) -> Self {
        Self {
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn fetch_all(&self, jobs: Vec<PageFetchJob>) -> Vec<PageResult> {
        info!(
            "Fetching {} pages with {} workers",
            jobs.len(),
            self.concurrency
        );

        let total = jobs.len();
        let results: Vec<PageResult> = stream::iter(jobs)
            .map(|job| {
                let fetcher = Arc::clone(&self.fetcher);
                async move { run_job(fetcher.as_ref(), job).await }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let fetched = results.iter().filter(|r| r.is_success()).count();
        info!("Fetched {} of {} pages", fetched, total);
        results
    }
}

async fn run_job(fetcher: &dyn PageFetcher, job: PageFetchJob) -> PageResult {
    let outcome = match timeout(job.timeout, fetcher.fetch(&job.url)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout {
            url: job.url.clone(),
            timeout: job.timeout,
        }),
    };

    match outcome {
        Ok(content) => PageResult::Success {
            url: job.url,
            content,
        },
        Err(cause) => {
            warn!("Page fetch failed: {}", cause);
            PageResult::Failure {
                url: job.url,
                cause,
            }
        }
    }
}
