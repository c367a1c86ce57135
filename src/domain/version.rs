use crate::error::{ReleaseError, Result};
use std::fmt;
use std::str::FromStr;

/// Semantic version representation
///
/// Only the plain `MAJOR.MINOR.PATCH` form is modelled. Ordering is
/// lexicographic on `(major, minor, patch)`, which the derived `Ord`
/// gives us through field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
        }
    }

    /// Parse a bare `MAJOR.MINOR.PATCH` string (e.g. "0.1.0")
    ///
    /// Leading zeros, pre-release and build metadata are rejected, so that
    /// every accepted string formats back to itself.
    pub fn parse(input: &str) -> Result<Self> {
        let parsed = semver::Version::parse(input).map_err(|e| {
            ReleaseError::parse(format!(
                "Invalid version '{}' - expected MAJOR.MINOR.PATCH ({})",
                input, e
            ))
        })?;

        if !parsed.pre.is_empty() {
            return Err(ReleaseError::parse(format!(
                "Pre-release versions are not supported: '{}'",
                input
            )));
        }
        if !parsed.build.is_empty() {
            return Err(ReleaseError::parse(format!(
                "Build metadata is not supported: '{}'",
                input
            )));
        }

        Ok(Version::new(parsed.major, parsed.minor, parsed.patch))
    }

    /// Bump version according to bump type
    ///
    /// The selected component grows by one and every lower-order component
    /// resets to zero. Fails only when the component would overflow.
    pub fn bump(&self, bump_type: VersionBump) -> Result<Self> {
        let overflow = || {
            ReleaseError::parse(format!(
                "Cannot apply {} bump to {}: component overflow",
                bump_type, self
            ))
        };

        let next = match bump_type {
            VersionBump::Major => Version {
                major: self.major.checked_add(1).ok_or_else(overflow)?,
                minor: 0,
                patch: 0,
            },
            VersionBump::Minor => Version {
                major: self.major,
                minor: self.minor.checked_add(1).ok_or_else(overflow)?,
                patch: 0,
            },
            VersionBump::Patch => Version {
                major: self.major,
                minor: self.minor,
                patch: self.patch.checked_add(1).ok_or_else(overflow)?,
            },
        };
        Ok(next)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        Version::parse(s)
    }
}

/// Which semantic version component to increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum VersionBump {
    Major,
    Minor,
    #[default]
    Patch,
}

impl VersionBump {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionBump::Major => "major",
            VersionBump::Minor => "minor",
            VersionBump::Patch => "patch",
        }
    }
}

impl fmt::Display for VersionBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionBump {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(VersionBump::Major),
            "minor" => Ok(VersionBump::Minor),
            "patch" => Ok(VersionBump::Patch),
            other => Err(ReleaseError::parse(format!(
                "Unknown bump '{}' - expected one of patch, minor, major",
                other
            ))),
        }
    }
}
