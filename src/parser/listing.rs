// Generic listing-card extraction driven by per-site selectors
use super::{compile_pattern, compile_selector};
use crate::config::{FieldLocator, ListingField, ListingSelectors};
use crate::model::{ConfigError, ExtractionError, ListingRecord};
use crate::normalizer::{collapse_whitespace, compose_title, normalize_field};
use crate::utils::absolutize;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

struct CompiledField {
    selector: Selector,
    nth: usize,
    pattern: Option<Regex>,
}

impl CompiledField {
    fn compile(site: &str, locator: &FieldLocator) -> Result<Self, ConfigError> {
        Ok(Self {
            selector: compile_selector(site, &locator.selector)?,
            nth: locator.nth,
            pattern: locator
                .pattern
                .as_deref()
                .map(|p| compile_pattern(site, p))
                .transpose()?,
        })
    }

    fn read(&self, card: &ElementRef, clean: fn(&str) -> String) -> Option<String> {
        let node = card.select(&self.selector).nth(self.nth)?;
        let text = clean(&node.text().collect::<String>());
        match &self.pattern {
            Some(re) => re
                .captures(&text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string()),
            None => Some(text),
        }
    }
}

struct CompiledAttributes {
    selector: Selector,
    fields: Vec<ListingField>,
}

/// Turns a results page into listing records. Pure: the same page always
/// yields the same records in the same order.
pub struct ListingExtractor {
    card: Selector,
    title: Vec<CompiledField>,
    link: Selector,
    link_attr: String,
    link_base: Option<String>,
    fields: Vec<(ListingField, CompiledField)>,
    attributes: Option<CompiledAttributes>,
}

impl ListingExtractor {
    pub fn from_config(
        site: &str,
        selectors: &ListingSelectors,
        link_base: Option<String>,
    ) -> Result<Self, ConfigError> {
        let title = selectors
            .title
            .iter()
            .map(|l| CompiledField::compile(site, l))
            .collect::<Result<Vec<_>, _>>()?;

        let named = [
            (ListingField::Price, &selectors.price),
            (ListingField::Year, &selectors.year),
            (ListingField::Km, &selectors.km),
            (ListingField::Transmission, &selectors.transmission),
            (ListingField::FuelType, &selectors.fuel_type),
        ];
        let mut fields = Vec::new();
        for (field, locator) in named {
            if let Some(locator) = locator {
                fields.push((field, CompiledField::compile(site, locator)?));
            }
        }

        let attributes = match &selectors.attributes {
            Some(attrs) => Some(CompiledAttributes {
                selector: compile_selector(site, &attrs.selector)?,
                fields: attrs.fields.clone(),
            }),
            None => None,
        };

        Ok(Self {
            card: compile_selector(site, &selectors.card)?,
            title,
            link: compile_selector(site, &selectors.link.selector)?,
            link_attr: selectors.link.attr.clone(),
            link_base,
            fields,
            attributes,
        })
    }

    /// Lazily yields one record per well-formed card, in document order.
    pub fn extract<'a>(&'a self, document: &'a Html) -> impl Iterator<Item = ListingRecord> + 'a {
        document
            .select(&self.card)
            .filter_map(move |card| match self.extract_card(&card) {
                Ok(record) => Some(record),
                Err(e) => {
                    debug!("Skipping listing card: {}", e);
                    None
                }
            })
    }

    pub fn extract_page(&self, html: &str) -> Vec<ListingRecord> {
        let document = Html::parse_document(html);
        self.extract(&document).collect()
    }

    pub fn extract_card(&self, card: &ElementRef) -> Result<ListingRecord, ExtractionError> {
        let title = compose_title(
            self.title
                .iter()
                .filter_map(|f| f.read(card, collapse_whitespace)),
        );
        if title.is_empty() {
            return Err(ExtractionError::MissingTitle);
        }

        let url = card
            .select(&self.link)
            .next()
            .and_then(|a| a.value().attr(&self.link_attr))
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .ok_or(ExtractionError::MissingUrl)?;

        let mut record = ListingRecord {
            title,
            url: absolutize(url, self.link_base.as_deref()),
            ..ListingRecord::default()
        };

        if let Some(attrs) = &self.attributes {
            let values: Vec<String> = card
                .select(&attrs.selector)
                .map(|n| normalize_field(&n.text().collect::<String>()))
                .collect();
            if values.len() != attrs.fields.len() {
                return Err(ExtractionError::AttributeCount {
                    expected: attrs.fields.len(),
                    found: values.len(),
                });
            }
            for (field, value) in attrs.fields.iter().zip(values) {
                set_field(&mut record, *field, value);
            }
        }

        for (field, locator) in &self.fields {
            if let Some(value) = locator.read(card, normalize_field) {
                set_field(&mut record, *field, value);
            }
        }

        Ok(record)
    }
}

fn set_field(record: &mut ListingRecord, field: ListingField, value: String) {
    match field {
        ListingField::Price => record.price = value,
        ListingField::Year => record.year = value,
        ListingField::Km => record.km = value,
        ListingField::Transmission => record.transmission = value,
        ListingField::FuelType => record.fuel_type = value,
    }
}
