use crate::ConfigError;
use regex::{Regex, RegexBuilder};

/// How a pattern string is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Shell-style glob (`*`, `?`, `[...]`) matched against the whole target
    Glob,
    /// Regular expression, searched anywhere in the target unless anchored
    Regex,
    /// Plain substring
    Substring,
}

impl PatternKind {
    /// Picks the kind from the pattern's syntax
    ///
    /// Glob metacharacters win, then regex anchors or classes; anything else
    /// is a substring.
    pub fn detect(source: &str) -> Self {
        if source.contains('*') || source.contains('?') {
            PatternKind::Glob
        } else if source.starts_with('^') || source.ends_with('$') || source.contains('[') {
            PatternKind::Regex
        } else {
            PatternKind::Substring
        }
    }
}

/// A compiled include/exclude pattern
///
/// Patterns are matched case-insensitively against a URL's path plus
/// query (see [`crate::url::match_target`]).
#[derive(Debug, Clone)]
pub struct UrlPattern {
    source: String,
    kind: PatternKind,
    regex: Option<Regex>,
    needle: String,
}

impl UrlPattern {
    /// Compiles a pattern, failing on invalid regular expressions
    pub fn compile(source: &str) -> Result<Self, ConfigError> {
        let kind = PatternKind::detect(source);

        let regex = match kind {
            PatternKind::Glob => Some(build_regex(&glob_to_regex(source), source)?),
            PatternKind::Regex => Some(build_regex(source, source)?),
            PatternKind::Substring => None,
        };

        Ok(Self {
            source: source.to_string(),
            kind,
            regex,
            needle: source.to_lowercase(),
        })
    }

    /// Tests the pattern against a lowercased path+query target
    pub fn is_match(&self, target: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(target),
            None => target.contains(&self.needle),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }
}

fn build_regex(expr: &str, source: &str) -> Result<Regex, ConfigError> {
    RegexBuilder::new(expr)
        .case_insensitive(true)
        .build()
        .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", source, e)))
}

/// Translates a shell glob into an anchored regular expression
fn glob_to_regex(glob: &str) -> String {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');

    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                // A class needs a closing bracket after at least one member.
                let start = i + 1;
                let mut end = start;
                if end < chars.len() && (chars[end] == '!' || chars[end] == '^') {
                    end += 1;
                }
                if end < chars.len() && chars[end] == ']' {
                    end += 1;
                }
                while end < chars.len() && chars[end] != ']' {
                    end += 1;
                }

                if end >= chars.len() {
                    out.push_str(r"\[");
                } else {
                    out.push('[');
                    let mut j = start;
                    if chars[j] == '!' || chars[j] == '^' {
                        out.push('^');
                        j += 1;
                    }
                    for &c in &chars[j..end] {
                        if c == '\\' || c == '[' {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                    out.push(']');
                    i = end;
                }
            }
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    out.push('$');
    out
}
