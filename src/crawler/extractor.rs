//! HTML extraction
//!
//! Pulls the title, visible text, outbound links and `<meta>` metadata out
//! of a fetched page.

use crate::crawler::fetcher::FetchResponse;
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use url::Url;

/// Elements whose text never counts as page content
const SKIPPED_TEXT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// `<meta name=...>` keys copied into page metadata
const META_NAMES: &[&str] = &["description", "author", "keywords", "date"];

/// Everything extracted from one page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
    pub title: Option<String>,
    pub text: Option<String>,
    pub links: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Not an HTML document (content type {0})")]
    NotHtml(String),

    #[error("Empty response body")]
    EmptyBody,
}

/// Turns a fetched body into structured page data
pub trait Extractor: Send + Sync {
    fn extract(&self, response: &FetchResponse, base_url: &Url) -> Result<Extracted, ExtractError>;
}

/// Extractor for HTML documents built on `scraper`
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links (same page anchors)
/// - Anything that does not resolve to http(s)
///
/// Links are returned absolute, without fragments, deduplicated in document
/// order.
#[derive(Debug, Clone)]
pub struct HtmlExtractor {
    extract_text: bool,
}

impl HtmlExtractor {
    pub fn new(extract_text: bool) -> Self {
        Self { extract_text }
    }
}

impl Default for HtmlExtractor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Extractor for HtmlExtractor {
    fn extract(&self, response: &FetchResponse, base_url: &Url) -> Result<Extracted, ExtractError> {
        if let Some(content_type) = &response.content_type {
            let lowered = content_type.to_ascii_lowercase();
            if !lowered.contains("html") && !lowered.contains("xml") {
                return Err(ExtractError::NotHtml(content_type.clone()));
            }
        }

        if response.body.trim().is_empty() {
            return Err(ExtractError::EmptyBody);
        }

        Ok(parse_html(&response.body, base_url, self.extract_text))
    }
}

/// Parses an HTML document and extracts page data
///
/// # Example
///
/// ```
/// use yoink::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url, true);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert_eq!(parsed.links, vec!["https://example.com/page"]);
/// ```
pub fn parse_html(html: &str, base_url: &Url, with_text: bool) -> Extracted {
    let document = Html::parse_document(html);

    Extracted {
        title: extract_title(&document),
        text: if with_text {
            extract_text(&document)
        } else {
            None
        },
        links: extract_links(&document, base_url),
        metadata: extract_metadata(&document),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .filter(|s| !s.is_empty())
}

/// Visible body text with whitespace collapsed
fn extract_text(document: &Html) -> Option<String> {
    let body_selector = Selector::parse("body").ok()?;
    let body = document.select(&body_selector).next()?;

    let mut parts: Vec<&str> = Vec::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |e| SKIPPED_TEXT_TAGS.contains(&e.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }

    let text = collapse_whitespace(&parts.join(" "));
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut push = |element: ElementRef<'_>| {
        if let Some(absolute) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        {
            if seen.insert(absolute.clone()) {
                links.push(absolute);
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            push(element);
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            push(element);
        }
    }

    links
}

/// `og:*` properties plus a few standard `<meta name>` keys
fn extract_metadata(document: &Html) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();

    if let Ok(selector) = Selector::parse("meta[property][content]") {
        for element in document.select(&selector) {
            let property = element.value().attr("property").unwrap_or_default();
            let content = element.value().attr("content").unwrap_or_default().trim();
            if property.starts_with("og:") && !content.is_empty() {
                metadata.insert(property.to_string(), content.to_string());
            }
        }
    }

    if let Ok(selector) = Selector::parse("meta[name][content]") {
        for element in document.select(&selector) {
            let name = element
                .value()
                .attr("name")
                .unwrap_or_default()
                .to_ascii_lowercase();
            let content = element.value().attr("content").unwrap_or_default().trim();
            if META_NAMES.contains(&name.as_str()) && !content.is_empty() {
                metadata.insert(name, content.to_string());
            }
        }
    }

    metadata
}

/// Resolves an href against the page URL
///
/// Returns `None` for links the crawler never follows.
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);

    Some(absolute.to_string())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
