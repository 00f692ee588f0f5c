use crate::model::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const DEFAULT_CONCURRENCY: usize = 17;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_POLITENESS_DELAY_MS: u64 = 2000;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_politeness_delay_ms")]
    pub politeness_delay_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Start pages without listings are dumped here.
    #[serde(default = "default_debug_html_dir")]
    pub debug_html_dir: PathBuf,
    pub sites: Vec<SiteConfig>,
}

impl AppConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    /// Picks the named sites, or every site when `names` is empty.
    pub fn select_sites(&self, names: &[String]) -> Result<Vec<&SiteConfig>, ConfigError> {
        if names.is_empty() {
            return Ok(self.sites.iter().collect());
        }
        names
            .iter()
            .map(|name| {
                self.sites
                    .iter()
                    .find(|s| s.name.eq_ignore_ascii_case(name))
                    .ok_or_else(|| ConfigError::UnknownSite(name.clone()))
            })
            .collect()
    }
}

/// Everything needed to scrape one classifieds site.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub start_url: String,
    /// URL of page N, with `{page}` standing for N.
    pub page_url_template: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub rounding: PageRounding,
    /// Absent means the site is scraped from its start page only.
    #[serde(default)]
    pub pagination: Option<PaginationLocator>,
    pub listing: ListingSelectors,
    #[serde(default)]
    pub link_base: Option<String>,
}

/// How a result count becomes a page count.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PageRounding {
    /// `count / size + 1`, and 0 for an empty result set.
    #[default]
    FloorPlusOne,
    Ceil,
    Floor,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaginationLocator {
    /// A result count somewhere in the text of the `nth` element matching `selector`.
    ResultCount {
        selector: String,
        #[serde(default)]
        nth: usize,
        /// First capture group holds the count. Defaults to the first number in the text.
        #[serde(default)]
        pattern: Option<String>,
    },
    /// A page-number list whose last entry is the page count.
    LastPageNumber { selector: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingSelectors {
    /// One match per listing card.
    pub card: String,
    /// Title fragments, joined with a space.
    pub title: Vec<FieldLocator>,
    #[serde(default)]
    pub link: LinkLocator,
    #[serde(default)]
    pub price: Option<FieldLocator>,
    #[serde(default)]
    pub year: Option<FieldLocator>,
    #[serde(default)]
    pub km: Option<FieldLocator>,
    #[serde(default)]
    pub transmission: Option<FieldLocator>,
    #[serde(default)]
    pub fuel_type: Option<FieldLocator>,
    #[serde(default)]
    pub attributes: Option<AttributeList>,
}

/// Locates a text value inside a card. Accepts a bare selector string in JSON.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(from = "FieldLocatorRepr")]
pub struct FieldLocator {
    pub selector: String,
    /// Which match of `selector` to read.
    pub nth: usize,
    /// Keeps only the first capture group of this regex.
    pub pattern: Option<String>,
}

impl FieldLocator {
    pub fn css(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            nth: 0,
            pattern: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldLocatorRepr {
    Selector(String),
    Full {
        selector: String,
        #[serde(default)]
        nth: usize,
        #[serde(default)]
        pattern: Option<String>,
    },
}

impl From<FieldLocatorRepr> for FieldLocator {
    fn from(repr: FieldLocatorRepr) -> Self {
        match repr {
            FieldLocatorRepr::Selector(selector) => FieldLocator::css(&selector),
            FieldLocatorRepr::Full {
                selector,
                nth,
                pattern,
            } => FieldLocator {
                selector,
                nth,
                pattern,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LinkLocator {
    #[serde(default = "default_link_selector")]
    pub selector: String,
    #[serde(default = "default_link_attr")]
    pub attr: String,
}

impl Default for LinkLocator {
    fn default() -> Self {
        Self {
            selector: default_link_selector(),
            attr: default_link_attr(),
        }
    }
}

/// Attribute nodes read positionally. A card whose node count differs from
/// `fields.len()` is malformed.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AttributeList {
    pub selector: String,
    pub fields: Vec<ListingField>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ListingField {
    Price,
    Year,
    Km,
    Transmission,
    FuelType,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_debug_html_dir() -> PathBuf {
    PathBuf::from("logs/html")
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_politeness_delay_ms() -> u64 {
    DEFAULT_POLITENESS_DELAY_MS
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) CarScout/0.1".to_string()
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_link_selector() -> String {
    "a".to_string()
}

fn default_link_attr() -> String {
    "href".to_string()
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    Ok(serde_json::from_str(content)?)
}

pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content)
}
