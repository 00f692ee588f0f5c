// HTML parsing: listing cards and pagination markers

pub mod listing;
pub mod pagination;

pub use listing::ListingExtractor;
pub use pagination::PaginationPlanner;

use crate::model::ConfigError;
use regex::Regex;
use scraper::Selector;

pub(crate) fn compile_selector(site: &str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|e| ConfigError::Selector {
        site: site.to_string(),
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn compile_pattern(site: &str, pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::Pattern {
        site: site.to_string(),
        pattern: pattern.to_string(),
        source,
    })
}
