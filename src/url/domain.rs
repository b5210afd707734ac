use url::Url;

/// Extracts the host from a URL
///
/// The `url` crate already lowercases and IDNA-normalizes hosts of special
/// schemes, so the returned value can be compared byte for byte.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use image_trawler::url::extract_host;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_host(&url), Some("example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}

/// Returns true if `candidate` lives on the same host as `origin`
///
/// This is an exact comparison of host and explicit port, never a substring
/// or suffix match. Default ports are not written out, so `http://host/` and
/// `https://host/` share a host while `host:8080` does not: `evil-example.com` and `example.com.evil.net` are both
/// foreign to `example.com`, and so is `blog.example.com`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use image_trawler::url::same_origin_host;
///
/// let seed = Url::parse("https://example.com/").unwrap();
/// let evil = Url::parse("https://evil-example.com/x").unwrap();
/// assert!(!same_origin_host(&seed, &evil));
/// ```
pub fn same_origin_host(origin: &Url, candidate: &Url) -> bool {
    match (extract_host(origin), extract_host(candidate)) {
        (Some(a), Some(b)) => {
            a == b && origin.port() == candidate.port()
        }
        _ => false,
    }
}
