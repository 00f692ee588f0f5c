// Page retrieval: HTTP fetcher, politeness policies and the bounded pool

pub mod fetcher;
pub mod pool;
pub mod rate_limit;
pub mod traits;

pub use fetcher::HttpFetcher;
pub use pool::FetchPool;
pub use rate_limit::{FixedDelay, Unthrottled};
pub use traits::{PageFetcher, RateLimiter};
