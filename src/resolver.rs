//! Release version and tag resolution.
//!
//! The pure pieces (`next_version`, `format_tag`, `latest_release_tag`)
//! take and return explicit values. [Resolver] binds them to a manifest
//! path, a tag pattern and a version source; its only side effect is
//! [Resolver::write_manifest_version].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::boundary::BoundaryWarning;
use crate::config::Config;
use crate::domain::{TagPattern, Version, VersionBump};
use crate::error::{ReleaseError, Result};
use crate::git::Repository;
use crate::manifest::{self, Manifest};

/// Where the current version is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionSource {
    /// The manifest's version field
    #[default]
    Manifest,
    /// The highest tag matching the pattern, falling back to the manifest
    Tags,
}

/// Highest release tag found in a repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestTag {
    pub tag: String,
    pub version: Version,
}

/// Outcome of reading the current version
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub version: Version,
    pub latest_tag: Option<LatestTag>,
    pub warnings: Vec<BoundaryWarning>,
}

/// Increment `version` by `bump`, resetting lower-order components
pub fn next_version(version: Version, bump: VersionBump) -> Result<Version> {
    version.bump(bump)
}

/// Render the release tag for `version`
pub fn format_tag(pattern: &TagPattern, version: &Version) -> String {
    pattern.format(version)
}

/// Pick the highest version among `tags` that match `pattern`
///
/// Tags of a different shape are ignored silently; tags that match the
/// pattern but carry an invalid version are reported as warnings.
pub fn latest_release_tag(
    pattern: &TagPattern,
    tags: &[String],
) -> (Option<LatestTag>, Vec<BoundaryWarning>) {
    let mut warnings = Vec::new();
    let mut latest: Option<LatestTag> = None;

    for tag in tags {
        match pattern.parse(tag) {
            None => continue,
            Some(Err(e)) => warnings.push(BoundaryWarning::UnparsableTag {
                tag: tag.clone(),
                reason: e.to_string(),
            }),
            Some(Ok(version)) => {
                if latest.as_ref().map_or(true, |l| version > l.version) {
                    latest = Some(LatestTag {
                        tag: tag.clone(),
                        version,
                    });
                }
            }
        }
    }

    (latest, warnings)
}

/// Fail with a tag conflict if `tag` already exists in `repo`
pub fn ensure_tag_available(repo: &dyn Repository, tag: &str) -> Result<()> {
    if repo.tag_exists(tag)? {
        return Err(ReleaseError::tag_conflict(tag));
    }
    Ok(())
}

/// Resolves versions and tags for one manifest
#[derive(Debug, Clone)]
pub struct Resolver {
    manifest_path: PathBuf,
    pattern: TagPattern,
    source: VersionSource,
}

impl Resolver {
    pub fn new(manifest_path: impl Into<PathBuf>, pattern: TagPattern, source: VersionSource) -> Self {
        Resolver {
            manifest_path: manifest_path.into(),
            pattern,
            source,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Resolver::new(
            config.manifest.clone(),
            config.tag_pattern()?,
            config.version_source,
        ))
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Whether resolving the current version needs a git repository
    pub fn needs_repository(&self) -> bool {
        self.source == VersionSource::Tags
    }

    /// Version declared by the manifest
    pub fn manifest_version(&self) -> Result<Version> {
        Manifest::load(&self.manifest_path)?.version()
    }

    /// Current version according to the configured source
    ///
    /// With a repository at hand the newest release tag is also looked up:
    /// for the manifest source it is only used to warn when the manifest
    /// lags behind, for the tag source it is the answer.
    pub fn current_version(&self, repo: Option<&dyn Repository>) -> Result<Resolution> {
        let (latest_tag, mut warnings) = match repo {
            Some(repo) => latest_release_tag(&self.pattern, &repo.list_tags()?),
            None => (None, Vec::new()),
        };

        let version = match self.source {
            VersionSource::Manifest => {
                let version = self.manifest_version()?;
                if let Some(latest) = latest_tag.as_ref().filter(|l| l.version > version) {
                    warnings.push(BoundaryWarning::ManifestBehindTag {
                        manifest: version,
                        latest_tag: latest.tag.clone(),
                    });
                }
                version
            }
            VersionSource::Tags => {
                if repo.is_none() {
                    return Err(ReleaseError::config(
                        "version_source = \"tags\" requires a git repository",
                    ));
                }
                match latest_tag.as_ref() {
                    Some(latest) => latest.version,
                    None => {
                        warnings.push(BoundaryWarning::NoReleaseTags {
                            pattern: self.pattern.as_str().to_string(),
                        });
                        self.manifest_version()?
                    }
                }
            }
        };

        debug!(%version, source = ?self.source, "resolved current version");
        Ok(Resolution {
            version,
            latest_tag,
            warnings,
        })
    }

    pub fn next_version(&self, version: Version, bump: VersionBump) -> Result<Version> {
        next_version(version, bump)
    }

    pub fn format_tag(&self, version: &Version) -> String {
        format_tag(&self.pattern, version)
    }

    /// Rewrite the manifest's version field; `Ok(false)` if it already matched
    pub fn write_manifest_version(&self, version: &Version) -> Result<bool> {
        let written = manifest::write_manifest_version(&self.manifest_path, version)?;
        if written {
            info!(path = %self.manifest_path.display(), %version, "updated manifest version");
        }
        Ok(written)
    }
}
