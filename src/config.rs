use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{TagPattern, Version, DEFAULT_TAG_PATTERN};
use crate::error::{ReleaseError, Result};
use crate::manifest::MANIFEST_FILE;
use crate::resolver::VersionSource;

/// File name looked up in the working directory
pub const CONFIG_FILE: &str = "release.toml";

/// File name looked up in the user config directory
pub const USER_CONFIG_FILE: &str = ".release.toml";

/// Represents the complete configuration for pyproject-release.
///
/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Manifest to read and rewrite
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    /// Tag naming pattern; must contain `{version}` once
    #[serde(default = "default_tag_pattern")]
    pub tag_pattern: String,

    /// Where the current version is read from
    #[serde(default)]
    pub version_source: VersionSource,

    /// Remote used for fetching and pushing tags
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Annotated tag message; `{tag}` and `{version}` are substituted
    #[serde(default = "default_tag_message")]
    pub tag_message: String,

    /// Commit message for the manifest bump; same placeholders as `tag_message`
    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    /// Directory scanned for Python packages
    #[serde(default = "default_src_dir")]
    pub src_dir: PathBuf,
}

fn default_manifest() -> PathBuf {
    PathBuf::from(MANIFEST_FILE)
}

fn default_tag_pattern() -> String {
    DEFAULT_TAG_PATTERN.to_string()
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_tag_message() -> String {
    "Release {tag}".to_string()
}

fn default_commit_message() -> String {
    "Bump version to {version}".to_string()
}

fn default_src_dir() -> PathBuf {
    PathBuf::from("src")
}

impl Default for Config {
    fn default() -> Self {
        Config {
            manifest: default_manifest(),
            tag_pattern: default_tag_pattern(),
            version_source: VersionSource::default(),
            remote: default_remote(),
            tag_message: default_tag_message(),
            commit_message: default_commit_message(),
            src_dir: default_src_dir(),
        }
    }
}

impl Config {
    /// Compile the configured tag pattern
    pub fn tag_pattern(&self) -> Result<TagPattern> {
        TagPattern::new(self.tag_pattern.clone())
    }

    /// Render the annotated tag message for a release
    pub fn render_tag_message(&self, tag: &str, version: &Version) -> String {
        render_template(&self.tag_message, tag, version)
    }

    /// Render the commit message for a manifest bump
    pub fn render_commit_message(&self, tag: &str, version: &Version) -> String {
        render_template(&self.commit_message, tag, version)
    }
}

fn render_template(template: &str, tag: &str, version: &Version) -> String {
    template
        .replace("{tag}", tag)
        .replace("{version}", &version.to_string())
}

/// Loads configuration from file or returns defaults.
///
/// Attempts to load configuration in the following order:
/// 1. Custom path provided as parameter
/// 2. `release.toml` in current directory
/// 3. `.release.toml` in the user config directory
/// 4. Default configuration if no file found
///
/// # Returns
/// * `Ok(Config)` - Loaded or default configuration
/// * `Err` - If a file exists but cannot be read or parsed, or if its tag
///   pattern is invalid
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let path = if let Some(path) = config_path {
        Some(path.to_path_buf())
    } else if Path::new(CONFIG_FILE).exists() {
        Some(PathBuf::from(CONFIG_FILE))
    } else {
        dirs::config_dir()
            .map(|dir| dir.join(USER_CONFIG_FILE))
            .filter(|path| path.exists())
    };

    let Some(path) = path else {
        debug!("no configuration file found, using defaults");
        return Ok(Config::default());
    };

    let config_str = fs::read_to_string(&path).map_err(|e| {
        ReleaseError::config(format!("cannot read {}: {}", path.display(), e))
    })?;
    let config: Config = toml::from_str(&config_str)
        .map_err(|e| ReleaseError::config(format!("invalid {}: {}", path.display(), e)))?;

    // Fail early rather than at tag time
    config.tag_pattern()?;

    debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.manifest, PathBuf::from("pyproject.toml"));
        assert_eq!(config.tag_pattern, "v{version}");
        assert_eq!(config.version_source, VersionSource::Manifest);
        assert_eq!(config.remote, "origin");
        assert_eq!(config.src_dir, PathBuf::from("src"));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(toml::from_str::<Config>("tag_prefix = \"v\"\n").is_err());
    }

    #[test]
    fn test_render_messages() {
        let config = Config::default();
        let version = Version::new(0, 1, 1);
        assert_eq!(config.render_tag_message("v0.1.1", &version), "Release v0.1.1");
        assert_eq!(
            config.render_commit_message("v0.1.1", &version),
            "Bump version to 0.1.1"
        );
    }
}
