//! URL handling module for Roster-Crawl
//!
//! Builds listing page URLs from the configured template and resolves the
//! hrefs found on those pages into absolute URLs.

use crate::{UrlError, UrlResult};
use url::Url;

const PARTITION_PLACEHOLDER: &str = "{partition}";
const PAGE_PLACEHOLDER: &str = "{page}";

/// Builds the URL of one listing page
///
/// `{partition}` and `{page}` in the template are substituted. The page
/// placeholder is required; the partition placeholder is optional so a
/// directory without partitions can still be crawled.
///
/// # Examples
///
/// ```
/// use roster_crawl::url::listing_url;
///
/// let url = listing_url("https://example.com/companies/{partition}-{page}", "x", 3).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/companies/x-3");
/// ```
pub fn listing_url(template: &str, partition: &str, page: u32) -> UrlResult<Url> {
    if !template.contains(PAGE_PLACEHOLDER) {
        return Err(UrlError::MissingPlaceholder(PAGE_PLACEHOLDER));
    }

    let raw = template
        .replace(PARTITION_PLACEHOLDER, partition)
        .replace(PAGE_PLACEHOLDER, &page.to_string());

    let url = Url::parse(&raw).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    Ok(url)
}

/// Resolves a link href against the page it was found on
///
/// Returns None if the link should be ignored:
/// - empty or fragment-only hrefs
/// - javascript:, mailto:, tel:, data: schemes
/// - anything that is not HTTP(S) after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => Some(absolute_url),
        _ => None,
    }
}
