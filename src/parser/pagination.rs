// Page-count discovery from the first results page
use super::{compile_pattern, compile_selector};
use crate::config::{PageRounding, PaginationLocator, SiteConfig};
use crate::model::{ConfigError, PaginationPlan, PlanningError};
use crate::normalizer::collapse_whitespace;
use crate::utils::{PAGE_PLACEHOLDER, page_url, parse_digits};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{info, warn};

const DEFAULT_COUNT_PATTERN: &str = r"(\d[\d,]*)";

enum CompiledLocator {
    ResultCount {
        marker: String,
        selector: Selector,
        nth: usize,
        pattern: Regex,
    },
    LastPageNumber {
        marker: String,
        selector: Selector,
    },
}

pub struct PaginationPlanner {
    locator: Option<CompiledLocator>,
    page_size: u32,
    rounding: PageRounding,
    template: String,
}

impl PaginationPlanner {
    pub fn from_config(site: &SiteConfig) -> Result<Self, ConfigError> {
        if !site.page_url_template.contains(PAGE_PLACEHOLDER) {
            return Err(ConfigError::Template {
                site: site.name.clone(),
                template: site.page_url_template.clone(),
            });
        }

        let locator = match &site.pagination {
            Some(PaginationLocator::ResultCount {
                selector,
                nth,
                pattern,
            }) => Some(CompiledLocator::ResultCount {
                marker: selector.clone(),
                selector: compile_selector(&site.name, selector)?,
                nth: *nth,
                pattern: compile_pattern(
                    &site.name,
                    pattern.as_deref().unwrap_or(DEFAULT_COUNT_PATTERN),
                )?,
            }),
            Some(PaginationLocator::LastPageNumber { selector }) => {
                Some(CompiledLocator::LastPageNumber {
                    marker: selector.clone(),
                    selector: compile_selector(&site.name, selector)?,
                })
            }
            None => None,
        };

        Ok(Self {
            locator,
            page_size: site.page_size.max(1),
            rounding: site.rounding,
            template: site.page_url_template.clone(),
        })
    }

    /// Never fails: a missing or malformed marker plans zero further pages.
    pub fn plan(&self, document: &Html) -> PaginationPlan {
        let total_pages = match self.total_pages(document) {
            Ok(total) => total,
            Err(e) => {
                warn!("Pagination unavailable, keeping first page only: {}", e);
                0
            }
        };
        info!("Total result pages: {}", total_pages);

        PaginationPlan {
            total_pages,
            page_urls: self.page_urls(total_pages),
        }
    }

    pub fn total_pages(&self, document: &Html) -> Result<u32, PlanningError> {
        match &self.locator {
            None => Ok(0),
            Some(CompiledLocator::ResultCount {
                marker,
                selector,
                nth,
                pattern,
            }) => {
                let node = document
                    .select(selector)
                    .nth(*nth)
                    .ok_or_else(|| PlanningError::MarkerMissing(marker.clone()))?;
                let text = collapse_whitespace(&node.text().collect::<String>());
                let count = pattern
                    .captures(&text)
                    .and_then(|c| c.get(1))
                    .and_then(|m| parse_digits(m.as_str()));
                match count {
                    Some(count) => Ok(page_count(count, self.page_size, self.rounding)),
                    None => Err(PlanningError::Unparsable(text)),
                }
            }
            Some(CompiledLocator::LastPageNumber { marker, selector }) => {
                let node = document
                    .select(selector)
                    .last()
                    .ok_or_else(|| PlanningError::MarkerMissing(marker.clone()))?;
                let text = collapse_whitespace(&node.text().collect::<String>());
                match parse_digits(&text) {
                    Some(pages) => Ok(clamp(pages)),
                    None => Err(PlanningError::Unparsable(text)),
                }
            }
        }
    }

    /// URLs of pages `2..=total_pages`.
    pub fn page_urls(&self, total_pages: u32) -> Vec<String> {
        (2..=total_pages)
            .map(|page| page_url(&self.template, page))
            .collect()
    }
}

pub fn page_count(results: u64, page_size: u32, rounding: PageRounding) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = match rounding {
        PageRounding::FloorPlusOne if results == 0 => 0,
        PageRounding::FloorPlusOne => results / size + 1,
        PageRounding::Ceil => results.div_ceil(size),
        PageRounding::Floor => results / size,
    };
    clamp(pages)
}

fn clamp(pages: u64) -> u32 {
    u32::try_from(pages).unwrap_or(u32::MAX)
}
