/// Checks whether a host belongs to a root domain
///
/// A host matches when it is the root itself or any subdomain of it:
/// - "example.com" matches "example.com"
/// - "blog.example.com" matches "example.com"
/// - "api.v2.example.com" matches "example.com"
///
/// Both arguments are expected in lowercase.
///
/// # Examples
///
/// ```
/// use site_archiver::url::host_matches_domain;
///
/// assert!(host_matches_domain("blog.example.com", "example.com"));
/// assert!(!host_matches_domain("notexample.com", "example.com"));
/// ```
pub fn host_matches_domain(host: &str, root: &str) -> bool {
    if root.is_empty() {
        return false;
    }

    host == root
        || host
            .strip_suffix(root)
            .map(|prefix| prefix.ends_with('.'))
            .unwrap_or(false)
}
