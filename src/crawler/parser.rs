//! HTML extraction for listing and detail pages
//!
//! This module handles parsing HTML content to extract:
//! - The ordered company entries on a listing page
//! - The external homepage link on a company's detail page

use crate::config::SelectorConfig;
use crate::url::resolve_link;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// One directory entry discovered on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Display name as extracted; used as the dedup key
    pub identity: String,

    /// Absolute URL of the company's detail page
    pub detail_url: Url,
}

/// Compiled selectors for both page kinds
#[derive(Debug, Clone)]
pub struct Extractor {
    listing_item: Selector,
    homepage_link: Selector,
}

impl Extractor {
    /// Compiles the configured selectors
    pub fn new(config: &SelectorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            listing_item: compile(&config.listing_item)?,
            homepage_link: compile(&config.homepage_link)?,
        })
    }

    /// Extracts company entries from a listing page, in document order
    ///
    /// Entries without a name or without a followable href are skipped.
    /// Relative hrefs are resolved against `page_url`.
    ///
    /// # Example
    ///
    /// ```
    /// use roster_crawl::config::SelectorConfig;
    /// use roster_crawl::crawler::Extractor;
    /// use url::Url;
    ///
    /// let extractor = Extractor::new(&SelectorConfig::default()).unwrap();
    /// let html = r#"<ul class="company-list"><li><a href="/c/acme">Acme</a></li></ul>"#;
    /// let page = Url::parse("https://example.com/companies/a-1").unwrap();
    /// let items = extractor.listing_items(html, &page);
    /// assert_eq!(items[0].identity, "Acme");
    /// assert_eq!(items[0].detail_url.as_str(), "https://example.com/c/acme");
    /// ```
    pub fn listing_items(&self, html: &str, page_url: &Url) -> Vec<Item> {
        let document = Html::parse_document(html);

        document
            .select(&self.listing_item)
            .filter_map(|element| {
                let identity = element_text(&element);
                if identity.is_empty() {
                    return None;
                }
                let href = element.value().attr("href")?;
                let detail_url = resolve_link(href, page_url)?;
                Some(Item {
                    identity,
                    detail_url,
                })
            })
            .collect()
    }

    /// Extracts the first followable homepage link from a detail page
    pub fn homepage_link(&self, html: &str, page_url: &Url) -> Option<String> {
        let document = Html::parse_document(html);

        document
            .select(&self.homepage_link)
            .filter_map(|element| element.value().attr("href"))
            .find_map(|href| resolve_link(href, page_url))
            .map(|url| url.to_string())
    }
}

fn compile(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// Element text with runs of whitespace collapsed
fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
