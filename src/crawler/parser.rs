//! HTML extraction of image sources and anchor targets
//!
//! Given a page body and the page's URL, this module yields:
//! - every `<img src>` as a normalized absolute URL
//! - every `<a href>` as a normalized absolute URL
//!
//! Both lists keep document order and drop repeats after the first
//! occurrence.

use crate::url::normalize_url;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Image and link references found on one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedPage {
    /// Image sources, in document order
    pub images: Vec<Url>,

    /// Anchor targets, in document order
    pub links: Vec<Url>,
}

/// Extracts image sources and anchor targets from an HTML document
///
/// # Reference Rules
///
/// **Skipped:**
/// - empty attribute values
/// - `javascript:`, `mailto:`, `tel:` and `data:` references
/// - fragment-only anchors (`#section`), which point back at the page itself
/// - references that do not resolve to http(s)
///
/// # Example
///
/// ```
/// use image_trawler::crawler::extract_page;
/// use url::Url;
///
/// let html = r#"<a href="/about">About</a><img src="logo.png">"#;
/// let page = Url::parse("https://example.com/home/").unwrap();
/// let extracted = extract_page(html, &page);
/// assert_eq!(extracted.links[0].as_str(), "https://example.com/about");
/// assert_eq!(extracted.images[0].as_str(), "https://example.com/home/logo.png");
/// ```
pub fn extract_page(html: &str, page_url: &Url) -> ExtractedPage {
    let document = Html::parse_document(html);

    ExtractedPage {
        images: collect_attr(&document, "img[src]", "src", page_url),
        links: collect_attr(&document, "a[href]", "href", page_url),
    }
}

fn collect_attr(document: &Html, selector: &str, attr: &str, page_url: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for element in document.select(&selector) {
        let Some(value) = element.value().attr(attr) else {
            continue;
        };

        if let Some(url) = resolve_reference(value, page_url) {
            if seen.insert(url.clone()) {
                urls.push(url);
            }
        }
    }

    urls
}

/// Resolves an attribute value to an absolute http(s) URL
///
/// Returns None if the reference should be excluded.
fn resolve_reference(value: &str, page_url: &Url) -> Option<Url> {
    let value = value.trim();

    if value.is_empty() || value.starts_with('#') {
        return None;
    }

    let lowered = value.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    match normalize_url(value, page_url) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Some(url),
        Ok(url) => {
            tracing::trace!("Skipping non-http reference {}", url);
            None
        }
        Err(e) => {
            tracing::debug!("Dropping unresolvable reference on {}: {}", page_url, e);
            None
        }
    }
}
