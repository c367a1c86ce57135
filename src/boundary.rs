use std::fmt;

use crate::domain::Version;

/// Non-fatal conditions noticed while resolving a release.
/// These are reported to the user but never change the exit status.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryWarning {
    /// No tag in the repository matches the configured pattern
    NoReleaseTags { pattern: String },
    /// Tag has the pattern's shape but its version cannot be parsed
    UnparsableTag { tag: String, reason: String },
    /// The manifest declares an older version than the newest release tag
    ManifestBehindTag { manifest: Version, latest_tag: String },
    /// Fetching tags failed; local tag data is used instead
    FetchFailed { remote: String, reason: String },
}

impl fmt::Display for BoundaryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryWarning::NoReleaseTags { pattern } => {
                write!(f, "No existing tags match pattern '{}'", pattern)
            }
            BoundaryWarning::UnparsableTag { tag, reason } => {
                write!(f, "Cannot parse tag '{}': {}", tag, reason)
            }
            BoundaryWarning::ManifestBehindTag {
                manifest,
                latest_tag,
            } => {
                write!(
                    f,
                    "Manifest version {} is behind the latest tag '{}'",
                    manifest, latest_tag
                )
            }
            BoundaryWarning::FetchFailed { remote, reason } => {
                write!(
                    f,
                    "Could not fetch tags from remote '{}': {}. Using local tags.",
                    remote, reason
                )
            }
        }
    }
}
