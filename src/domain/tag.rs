use crate::domain::Version;
use crate::error::{ReleaseError, Result};
use regex::Regex;

/// Placeholder substituted with the rendered version
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Tag pattern used when nothing is configured
pub const DEFAULT_TAG_PATTERN: &str = "v{version}";

/// Tag naming pattern (e.g., "v{version}", "release-{version}")
///
/// The pattern is validated once on construction: it must contain the
/// placeholder exactly once and every tag it renders must be a legal
/// git ref name.
#[derive(Debug, Clone)]
pub struct TagPattern {
    pattern: String,
    matcher: Regex,
}

impl TagPattern {
    /// Create a new tag pattern
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();

        if pattern.matches(VERSION_PLACEHOLDER).count() != 1 {
            return Err(ReleaseError::config(format!(
                "Tag pattern '{}' must contain {} exactly once",
                pattern, VERSION_PLACEHOLDER
            )));
        }

        // Escape everything, then swap the placeholder for a capture group
        let escaped = regex::escape(&pattern);
        let regex_pattern = escaped.replace(
            &regex::escape(VERSION_PLACEHOLDER),
            r"(?P<version>\d+\.\d+\.\d+)",
        );
        let matcher = Regex::new(&format!("^{}$", regex_pattern)).map_err(|e| {
            ReleaseError::config(format!("Invalid tag pattern '{}': {}", pattern, e))
        })?;

        let tag_pattern = TagPattern { pattern, matcher };
        let probe = tag_pattern.format(&Version::new(0, 0, 0));
        if !is_valid_tag_name(&probe) {
            return Err(ReleaseError::config(format!(
                "Tag pattern '{}' does not produce valid git tag names (e.g. '{}')",
                tag_pattern.pattern, probe
            )));
        }

        Ok(tag_pattern)
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Format a version according to pattern
    /// Example: pattern="v{version}", version=1.2.3 -> "v1.2.3"
    pub fn format(&self, version: &Version) -> String {
        self.pattern
            .replace(VERSION_PLACEHOLDER, &version.to_string())
    }

    /// Validate if a tag matches this pattern
    pub fn matches(&self, tag: &str) -> bool {
        self.matcher.is_match(tag)
    }

    /// Recover the version from a tag rendered by this pattern
    ///
    /// Returns `None` for tags that do not have the pattern's shape, and a
    /// parse error for tags that do but carry a malformed version (for
    /// instance "v01.2.3").
    pub fn parse(&self, tag: &str) -> Option<Result<Version>> {
        let captures = self.matcher.captures(tag)?;
        let version = captures.name("version")?.as_str();
        Some(Version::parse(version))
    }
}

impl Default for TagPattern {
    fn default() -> Self {
        let pattern = DEFAULT_TAG_PATTERN.to_string();
        let matcher = Regex::new(r"^v(?P<version>\d+\.\d+\.\d+)$")
            .expect("default tag pattern is a valid regex");
        TagPattern { pattern, matcher }
    }
}

/// Whether `name` can be used as `refs/tags/<name>`
pub fn is_valid_tag_name(name: &str) -> bool {
    !name.is_empty() && git2::Reference::is_valid_name(&format!("refs/tags/{}", name))
}
