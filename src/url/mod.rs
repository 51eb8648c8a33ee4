//! URL handling module for Site-Archiver
//!
//! This module provides URL normalization, root-domain extraction and the
//! in-domain test used to keep the crawl on one site.

mod domain;
mod matcher;
mod normalize;

use ::url::Url;

// Re-export main functions
pub use domain::{extract_domain, root_domain};
pub use matcher::host_matches_domain;
pub use normalize::{is_tracking_param, normalize_url, Normalizer, TRACKING_PREFIX};

/// Checks whether `candidate` lives on the site rooted at `root`
///
/// The candidate must be an http(s) URL with a host that is `root` or one of
/// its subdomains.
///
/// # Examples
///
/// ```
/// use site_archiver::url::is_in_domain;
///
/// assert!(is_in_domain("https://docs.site.test/a", "site.test"));
/// assert!(!is_in_domain("https://external.test/", "site.test"));
/// ```
pub fn is_in_domain(candidate: &str, root: &str) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return false;
    }

    extract_domain(&url)
        .map(|host| host_matches_domain(&host, root))
        .unwrap_or(false)
}
