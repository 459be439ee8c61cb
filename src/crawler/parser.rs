//! HTML link extraction
//!
//! This module defines the link extraction capability and an implementation
//! built on `scraper`. Extraction returns raw href values exactly as written;
//! resolving and filtering them is the normalizer's job.

use scraper::{Html, Selector};

/// Capability to pull outbound links out of a fetched document
pub trait LinkExtractor: Send + Sync {
    /// Returns every raw href found in `body`, in document order
    fn extract_links(&self, body: &str) -> Vec<String>;
}

/// Extracts links from HTML documents
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `<link rel="stylesheet" ...>`, `<script src="...">`, `<img src="...">`
///
/// **Note:** `rel="nofollow"` links ARE followed
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlLinkExtractor;

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, body: &str) -> Vec<String> {
        let document = Html::parse_document(body);
        let mut links = Vec::new();

        if let Ok(a_selector) = Selector::parse("a[href]") {
            for element in document.select(&a_selector) {
                if element.value().attr("download").is_some() {
                    continue;
                }

                if let Some(href) = element.value().attr("href") {
                    links.push(href.to_string());
                }
            }
        }

        if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
            for element in document.select(&canonical_selector) {
                if let Some(href) = element.value().attr("href") {
                    links.push(href.to_string());
                }
            }
        }

        links
    }
}
