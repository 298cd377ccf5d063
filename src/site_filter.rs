use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::RwLock;

/// Compiled patterns shared by every filter in the process.
static COMPILED: Lazy<RwLock<HashMap<String, Regex>>> = Lazy::new(|| RwLock::new(HashMap::new()));

fn cached_regex(pattern: &str) -> Result<Regex, regex::Error> {
    if let Some(regex) = COMPILED.read().ok().and_then(|c| c.get(pattern).cloned()) {
        return Ok(regex);
    }
    let source = pattern.replace('*', ".*");
    let regex = RegexBuilder::new(&source).case_insensitive(true).build()?;
    if let Ok(mut cache) = COMPILED.write() {
        cache.insert(pattern.to_string(), regex.clone());
    }
    Ok(regex)
}

/// Where the page currently is: full href plus hostname.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLocation {
    pub href: String,
    pub host: String,
}

impl PageLocation {
    pub fn new(href: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            host: host.into(),
        }
    }

    /// Build a location from an href, deriving the host with `url`.
    pub fn from_href(href: &str) -> Self {
        let host = url::Url::parse(href)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        Self::new(href, host)
    }
}

/// One blacklist glob compiled to a matcher.
///
/// The translation is literal: each `*` becomes `.*` and nothing else is
/// escaped, so `.` in a pattern still matches any character. The matcher is
/// unanchored and case-insensitive.
#[derive(Debug, Clone)]
pub struct BlacklistRule {
    pattern: String,
    regex: Regex,
}

impl BlacklistRule {
    pub fn compile(pattern: &str) -> Option<Self> {
        match cached_regex(pattern) {
            Ok(regex) => Some(Self {
                pattern: pattern.to_string(),
                regex,
            }),
            Err(err) => {
                tracing::warn!(pattern, %err, "skipping invalid blacklist pattern");
                None
            }
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, location: &PageLocation) -> bool {
        self.regex.is_match(&location.href) || self.regex.is_match(&location.host)
    }
}

/// Decides whether drag gestures are active for a location.
#[derive(Debug, Default)]
pub struct SiteFilter {
    patterns: Vec<String>,
    rules: Vec<BlacklistRule>,
    compiled_for: Option<PageLocation>,
}

impl SiteFilter {
    pub fn new(patterns: Vec<String>) -> Self {
        Self {
            patterns,
            rules: Vec::new(),
            compiled_for: None,
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn set_patterns(&mut self, patterns: Vec<String>) {
        if self.patterns != patterns {
            self.patterns = patterns;
            self.compiled_for = None;
        }
    }

    /// True when `location` differs from the one the rules were compiled for.
    pub fn needs_refresh(&self, location: &PageLocation) -> bool {
        self.compiled_for.as_ref() != Some(location)
    }

    pub fn last_location(&self) -> Option<&PageLocation> {
        self.compiled_for.as_ref()
    }

    fn recompile(&mut self, location: &PageLocation) {
        self.rules = self
            .patterns
            .iter()
            .filter_map(|p| BlacklistRule::compile(p))
            .collect();
        self.compiled_for = Some(location.clone());
        tracing::debug!(
            rules = self.rules.len(),
            href = %location.href,
            "blacklist compiled"
        );
    }

    pub fn is_blacklisted(&mut self, location: &PageLocation) -> bool {
        if self.needs_refresh(location) {
            self.recompile(location);
        }
        self.rules.iter().any(|rule| rule.matches(location))
    }
}
