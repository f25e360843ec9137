use crate::UrlError;
use url::Url;

/// Query parameters that only carry click tracking and never change content
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid", "msclkid"];

/// Normalizes a URL into its canonical form
///
/// Two URLs that differ only in scheme/host case, fragment, dot segments,
/// duplicate or trailing slashes, tracking parameters or query order map to
/// the same canonical form. The frontier keys every dedup set on this form.
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed or not absolute
/// 2. Reject anything that is not `http` or `https`
/// 3. Lowercase scheme and host, drop the default port
/// 4. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse repeated slashes
///    - Remove trailing slash (except for root /)
/// 5. Remove fragment
/// 6. Remove tracking query parameters (`utm_*`, `fbclid`, ...)
/// 7. Sort remaining query parameters by key
///
/// # Examples
///
/// ```
/// use yoink::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.COM/docs/./a/#intro").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/docs/a");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    // The url crate already lowercases special-scheme hosts and strips
    // default ports; an empty host is the only thing left to reject.
    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingDomain),
    }

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(url)
}

/// Normalizes a URL string and returns the canonical string form
pub fn canonicalize(url_str: &str) -> Result<String, UrlError> {
    normalize_url(url_str).map(String::from)
}

/// Normalizes a URL path by removing dot segments and redundant slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

/// Drops tracking parameters and sorts the rest by key, keeping the
/// relative order of repeated keys
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));

    params
}

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}
