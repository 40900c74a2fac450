//! Glob-style target patterns for call and field rules.
//!
//! Targets are `owner.name` strings such as `java/io/PrintStream.println`.
//!
//! | Pattern      | Matches when the target           |
//! |--------------|-----------------------------------|
//! | `*text*`     | contains `text`                   |
//! | `*suffix`    | ends with `suffix`                |
//! | `prefix*`    | starts with `prefix`              |
//! | `a*b`        | matches the glob (`*` = any run)  |
//! | `literal`    | equals it, or matches it as regex |
//!
//! An absent pattern matches every target.

use regex::Regex;

/// A compiled target pattern.
#[derive(Debug, Clone)]
pub enum TargetPattern {
    /// `*text*`
    Contains(String),
    /// `*suffix`
    Suffix(String),
    /// `prefix*`
    Prefix(String),
    /// Interior wildcards, translated to an anchored regex.
    Glob(Regex),
    /// No wildcard. The regex is absent when the literal is not a valid
    /// expression.
    Exact {
        /// The literal text.
        literal: String,
        /// The literal compiled as an anchored regex.
        regex: Option<Regex>,
    },
}

fn anchored(expression: &str) -> Option<Regex> {
    Regex::new(&format!("^(?:{expression})$")).ok()
}

fn glob(pattern: &str) -> Option<Regex> {
    let expression = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    anchored(&expression)
}

impl TargetPattern {
    /// Compiles a pattern.
    #[must_use]
    pub fn compile(pattern: &str) -> Self {
        let leading = pattern.starts_with('*');
        let trailing = pattern.len() > 1 && pattern.ends_with('*');
        let inner = pattern.strip_prefix('*').unwrap_or(pattern);
        let inner = if trailing {
            inner.strip_suffix('*').unwrap_or(inner)
        } else {
            inner
        };

        if !pattern.contains('*') {
            return TargetPattern::Exact {
                literal: pattern.to_string(),
                regex: anchored(pattern),
            };
        }
        if inner.contains('*') {
            return glob(pattern).map_or_else(|| TargetPattern::Contains(inner.to_string()), TargetPattern::Glob);
        }
        match (leading, trailing) {
            (true, true) => TargetPattern::Contains(inner.to_string()),
            (true, false) => TargetPattern::Suffix(inner.to_string()),
            _ => TargetPattern::Prefix(inner.to_string()),
        }
    }

    /// Tests a target.
    #[must_use]
    pub fn matches(&self, target: &str) -> bool {
        match self {
            TargetPattern::Contains(text) => target.contains(text.as_str()),
            TargetPattern::Suffix(suffix) => target.ends_with(suffix.as_str()),
            TargetPattern::Prefix(prefix) => target.starts_with(prefix.as_str()),
            TargetPattern::Glob(regex) => regex.is_match(target),
            TargetPattern::Exact { literal, regex } => {
                target == literal || regex.as_ref().is_some_and(|r| r.is_match(target))
            }
        }
    }
}

/// Tests `target` against an optional pattern source.
#[must_use]
pub fn matches_target(target: &str, pattern: Option<&str>) -> bool {
    pattern.map_or(true, |p| TargetPattern::compile(p).matches(target))
}
