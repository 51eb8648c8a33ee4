use url::{Host, Url};

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_archiver::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Extracts the root domain used for in-domain checks
///
/// The root is the registrable domain of the host according to the public
/// suffix list: `blog.example.com` gives `example.com` and `www.example.co.uk`
/// gives `example.co.uk`. IP addresses and hosts with no registrable part,
/// such as `localhost`, are their own root.
///
/// # Examples
///
/// ```
/// use site_archiver::url::root_domain;
///
/// assert_eq!(root_domain("https://www.blog.example.com/a"), Some("example.com".to_string()));
/// assert_eq!(root_domain("https://shop.example.co.uk/"), Some("example.co.uk".to_string()));
/// assert_eq!(root_domain("http://127.0.0.1:8080/"), Some("127.0.0.1".to_string()));
/// assert_eq!(root_domain("not a url"), None);
/// ```
pub fn root_domain(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;

    match url.host()? {
        Host::Domain(domain) => {
            let host = domain.trim_end_matches('.').to_lowercase();
            let root = psl::domain_str(&host).unwrap_or(host.as_str());
            Some(root.to_string())
        }
        Host::Ipv4(addr) => Some(addr.to_string()),
        Host::Ipv6(addr) => Some(format!("[{}]", addr)),
    }
}
