//! URL handling
//!
//! Canonicalization, host extraction and domain pattern matching. Every
//! URL that enters the frontier passes through [`normalize_url`] first.

mod domain;
mod matcher;
mod normalize;

pub use domain::extract_domain;
pub use matcher::{matches_any_domain, matches_domain};
pub use normalize::{canonicalize, normalize_url};

/// Returns the path plus query of a URL, lowercased, as seen by URL patterns
///
/// ```
/// use url::Url;
/// use yoink::url::match_target;
///
/// let url = Url::parse("https://example.com/Blog/Post?Page=2").unwrap();
/// assert_eq!(match_target(&url), "/blog/post?page=2");
/// ```
pub fn match_target(url: &::url::Url) -> String {
    let mut target = url.path().to_lowercase();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(&query.to_lowercase());
    }
    target
}
