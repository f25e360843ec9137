/// Checks if a host falls under a domain pattern
///
/// Patterns come in two forms:
/// 1. Plain domain: "example.com" matches "example.com" and every subdomain
///    of it ("blog.example.com", "api.v2.example.com")
/// 2. Wildcard: "*.example.com" matches the same set; the prefix is accepted
///    for readability in config files
///
/// Both sides are compared case-insensitively. A leading dot on the
/// pattern is ignored.
///
/// # Examples
///
/// ```
/// use yoink::url::matches_domain;
///
/// assert!(matches_domain("example.com", "example.com"));
/// assert!(matches_domain("example.com", "docs.example.com"));
/// assert!(matches_domain("*.example.com", "api.v2.example.com"));
/// assert!(!matches_domain("example.com", "notexample.com"));
/// ```
pub fn matches_domain(pattern: &str, host: &str) -> bool {
    let base = pattern
        .trim()
        .trim_start_matches("*.")
        .trim_start_matches('.')
        .to_ascii_lowercase();
    let host = host.to_ascii_lowercase();

    if base.is_empty() || host.is_empty() {
        return false;
    }

    host == base || host.ends_with(&format!(".{}", base))
}

/// Returns true if the host matches any pattern in the list
pub fn matches_any_domain<S: AsRef<str>>(patterns: &[S], host: &str) -> bool {
    patterns.iter().any(|p| matches_domain(p.as_ref(), host))
}
