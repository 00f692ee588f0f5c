use crate::model::FetchError;

/// Retrieves the raw HTML of one page.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Politeness policy applied before every request.
#[async_trait::async_trait]
pub trait RateLimiter: Send + Sync {
    async fn wait(&self);
}
