use url::{Position, Url};

/// Query keys starting with this marker are tracking tags and never part of a key
pub const TRACKING_PREFIX: &str = "utm_";

/// Click identifiers dropped alongside the `utm_*` family
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Canonicalizes raw URLs into deduplication keys
///
/// # Normalization Steps
///
/// 1. Parse the URL; anything that does not parse as an http(s) URL with a
///    host falls back to an opaque key (fragment and trailing slashes removed)
/// 2. Force the scheme to the canonical value
/// 3. Remove the fragment
/// 4. Remove trailing slashes from the path (the root path has no slash in the key)
/// 5. Remove tracking query parameters
/// 6. Sort the remaining query parameters by key; drop an empty query
///
/// Normalization is total and idempotent: `normalize(normalize(u)) == normalize(u)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    scheme: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new("https")
    }
}

impl Normalizer {
    /// Creates a normalizer forcing every key to `scheme` (`http` or `https`)
    pub fn new(scheme: &str) -> Self {
        Self {
            scheme: scheme.to_ascii_lowercase(),
        }
    }

    /// The canonical scheme of produced keys
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Normalizes a raw URL string into its key
    ///
    /// # Examples
    ///
    /// ```
    /// use site_archiver::url::Normalizer;
    ///
    /// let normalizer = Normalizer::default();
    /// assert_eq!(
    ///     normalizer.normalize("http://Example.com/page/?utm_source=x#top"),
    ///     "https://example.com/page"
    /// );
    /// assert_eq!(normalizer.normalize("https://example.com/"), "https://example.com");
    /// ```
    pub fn normalize(&self, raw: &str) -> String {
        let raw = raw.trim();

        match Url::parse(raw) {
            Ok(url) if url.has_host() && matches!(url.scheme(), "http" | "https") => {
                self.normalize_parsed(url)
                    .unwrap_or_else(|| normalize_opaque(raw))
            }
            _ => {
                tracing::trace!("Using opaque key for unparseable URL: {}", raw);
                normalize_opaque(raw)
            }
        }
    }

    fn normalize_parsed(&self, mut url: Url) -> Option<String> {
        url.set_scheme(&self.scheme).ok()?;
        // Re-parse so a port that became the scheme default is dropped
        let mut url = Url::parse(url.as_str()).ok()?;
        url.set_fragment(None);

        let path = url.path().trim_end_matches('/').to_string();
        if path.is_empty() {
            url.set_path("/");
        } else {
            url.set_path(&path);
        }

        if url.query().is_some() {
            let params = filter_and_sort_query_params(&url);
            if params.is_empty() {
                url.set_query(None);
            } else {
                url.query_pairs_mut().clear().extend_pairs(params);
            }
        }

        Some(to_key(&url))
    }
}

/// Normalizes with the default (`https`) canonical scheme
pub fn normalize_url(raw: &str) -> String {
    Normalizer::default().normalize(raw)
}

/// Serializes a normalized URL, leaving out the slash of a root path
fn to_key(url: &Url) -> String {
    let mut key = url[..Position::AfterPort].to_string();

    if url.path() != "/" {
        key.push_str(url.path());
    }

    if let Some(query) = url.query() {
        key.push('?');
        key.push_str(query);
    }

    key
}

/// Best-effort key for strings that are not http(s) URLs
fn normalize_opaque(raw: &str) -> String {
    let without_fragment = raw.split_once('#').map(|(head, _)| head).unwrap_or(raw);
    let trimmed = without_fragment.trim_end_matches('/');

    if trimmed.is_empty() && !without_fragment.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    // Stable: repeated keys keep their relative order
    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

/// Checks if a query parameter is a tracking parameter
pub fn is_tracking_param(key: &str) -> bool {
    key.starts_with(TRACKING_PREFIX) || TRACKING_PARAMS.contains(&key)
}
