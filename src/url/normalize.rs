use crate::UrlError;
use url::Url;

/// Resolves `reference` against `base` and strips the fragment
///
/// Resolution follows the WHATWG URL rules implemented by the `url` crate:
/// scheme and host are inherited for relative references, `.` and `..`
/// segments are collapsed, and the query is kept verbatim. The fragment is
/// always removed so `page#a` and `page#b` dedupe to the same entity.
///
/// The result is idempotent: normalizing an already-normalized URL against
/// the same base returns it unchanged.
///
/// # Arguments
///
/// * `reference` - The raw attribute value (absolute or relative)
/// * `base` - The URL of the page the reference was found on
///
/// # Returns
///
/// * `Ok(Url)` - Normalized absolute URL
/// * `Err(UrlError)` - The reference cannot be resolved at all (e.g. an invalid port)
///
/// # Examples
///
/// ```
/// use image_trawler::url::normalize_url;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/a/b/page").unwrap();
/// let url = normalize_url("../img/logo.png#top", &base).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/a/img/logo.png");
/// ```
pub fn normalize_url(reference: &str, base: &Url) -> Result<Url, UrlError> {
    let mut url = base
        .join(reference.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", reference, e)))?;
    url.set_fragment(None);
    Ok(url)
}

/// Parses the crawl seed
///
/// The seed must be an absolute http(s) URL with a host. Its fragment is
/// removed so it compares equal to links pointing back at it.
pub fn parse_seed(seed: &str) -> Result<Url, UrlError> {
    let mut url =
        Url::parse(seed.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost(seed.to_string()));
    }

    url.set_fragment(None);
    Ok(url)
}
