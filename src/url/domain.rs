use url::Url;

/// Extracts the lowercase host from a URL
///
/// Returns `None` for URLs without a host. The port is not part of the
/// result.
///
/// ```
/// use url::Url;
/// use yoink::url::extract_domain;
///
/// let url = Url::parse("https://Docs.Example.com:8443/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("docs.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}
