//! Link extraction from fetched HTML
//!
//! The parser is best-effort: malformed markup yields whatever anchors the
//! HTML5 parser recovers, never an error.

use crate::url::{is_in_domain, root_domain, Normalizer};
use scraper::{Html, Selector};
use url::Url;

/// Extracts every followable link on a page, in document order
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Anything that does not resolve to an http(s) URL
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
///
/// # Example
///
/// ```
/// use site_archiver::crawler::parse_links;
/// use url::Url;
///
/// let html = r#"<html><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// assert_eq!(parse_links(html, &base_url), vec!["https://example.com/page"]);
/// ```
pub fn parse_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Extracts the normalized in-domain links of a page
///
/// Links are resolved against `base_url`, normalized, and kept only when their
/// host belongs to the root domain of `base_url`. Document order is preserved
/// so the breadth-first enqueue order is reproducible. Duplicates are left in;
/// the frontier discards them.
pub fn extract_in_domain_links(base_url: &Url, html: &str, normalizer: &Normalizer) -> Vec<String> {
    let Some(root) = root_domain(base_url.as_str()) else {
        return Vec::new();
    };

    parse_links(html, base_url)
        .into_iter()
        .filter(|link| is_in_domain(link, &root))
        .map(|link| normalizer.normalize(&link))
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
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

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
