//! URL admission filtering
//!
//! The [`FilterEngine`] decides whether a canonical URL may enter the
//! frontier. Rejections carry a human-readable reason that the frontier
//! records in its `filtered_out` map.
//!
//! Rules are evaluated in a fixed order and exclusions always beat
//! inclusions:
//!
//! 1. Host scope (same host as the start URL unless external links are followed)
//! 2. Allowed domains
//! 3. Denied file extensions
//! 4. Exclude patterns
//! 5. Include patterns (when any are configured, one must match)

mod pattern;

pub use pattern::{PatternKind, UrlPattern};

use crate::config::FilterConfig;
use crate::url::{extract_domain, match_target, matches_any_domain, normalize_url};
use crate::ConfigError;
use url::Url;

/// Result of an admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub accept: bool,
    pub reason: String,
}

impl Admission {
    fn accepted() -> Self {
        Self {
            accept: true,
            reason: "accepted".to_string(),
        }
    }

    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            accept: false,
            reason: reason.into(),
        }
    }
}

/// Compiled admission rules
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    include: Vec<UrlPattern>,
    exclude: Vec<UrlPattern>,
    skip_extensions: Vec<String>,
    allowed_domains: Vec<String>,
    scope_host: Option<String>,
}

impl FilterEngine {
    /// Compiles the filter section of a config
    pub fn new(config: &FilterConfig) -> Result<Self, ConfigError> {
        let include = config
            .include
            .iter()
            .map(|p| UrlPattern::compile(p))
            .collect::<Result<Vec<_>, _>>()?;
        let exclude = config
            .exclude
            .iter()
            .map(|p| UrlPattern::compile(p))
            .collect::<Result<Vec<_>, _>>()?;

        let skip_extensions = config
            .skip_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| format!(".{}", ext))
            .collect();

        Ok(Self {
            include,
            exclude,
            skip_extensions,
            allowed_domains: config.allowed_domains.clone(),
            scope_host: None,
        })
    }

    /// An engine that admits every URL
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Restricts admission to URLs on the given host
    pub fn with_scope_host(mut self, host: impl Into<String>) -> Self {
        self.scope_host = Some(host.into().to_lowercase());
        self
    }

    /// Decides whether a canonical URL may be enqueued
    ///
    /// Pure: the same URL always gets the same answer from the same engine.
    pub fn admit(&self, url: &Url) -> Admission {
        let host = extract_domain(url).unwrap_or_default();

        if let Some(scope) = &self.scope_host {
            if &host != scope {
                return Admission::rejected(format!("external domain: {}", host));
            }
        }

        if !self.allowed_domains.is_empty() && !matches_any_domain(&self.allowed_domains, &host) {
            return Admission::rejected(format!("domain not allowed: {}", host));
        }

        let path = url.path().to_lowercase();
        if let Some(ext) = self.skip_extensions.iter().find(|ext| path.ends_with(ext.as_str())) {
            return Admission::rejected(format!("denied extension: {}", ext));
        }

        let target = match_target(url);

        if let Some(pattern) = self.exclude.iter().find(|p| p.is_match(&target)) {
            return Admission::rejected(format!("matched exclude pattern: {}", pattern.as_str()));
        }

        if !self.include.is_empty() && !self.include.iter().any(|p| p.is_match(&target)) {
            return Admission::rejected("no include pattern matched");
        }

        Admission::accepted()
    }

    /// Canonicalizes a URL string and checks it
    pub fn admit_str(&self, url: &str) -> Admission {
        match normalize_url(url) {
            Ok(url) => self.admit(&url),
            Err(e) => Admission::rejected(format!("invalid url: {}", e)),
        }
    }
}
