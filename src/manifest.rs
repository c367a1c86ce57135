//! Lossless access to the project manifest (`pyproject.toml`).
//!
//! The manifest is parsed with `toml_edit` so that a rewrite only touches
//! the bytes of the value being changed. Writes go to a sibling temporary
//! file which is then renamed over the original.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use toml_edit::{Array, DocumentMut, Item, Table, Value};
use tracing::debug;

use crate::domain::Version;
use crate::error::{ReleaseError, Result};

/// Default manifest file name
pub const MANIFEST_FILE: &str = "pyproject.toml";

/// Places a version may live, in lookup order
const VERSION_PATHS: &[&[&str]] = &[&["project", "version"], &["tool", "poetry", "version"]];

const WHEEL_PACKAGES_PATH: &[&str] = &["tool", "hatch", "build", "targets", "wheel", "packages"];

/// Runtime and development requirements declared by the manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    pub runtime: Vec<String>,
    pub dev: Vec<String>,
}

/// A parsed manifest together with the text it was read from
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    original: String,
    doc: DocumentMut,
}

impl Manifest {
    /// Read and parse the manifest at `path`
    ///
    /// Missing or syntactically invalid files are reported as parse errors.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::read(path.as_ref()).map_err(ReleaseError::Parse)
    }

    fn read(path: &Path) -> std::result::Result<Self, String> {
        let original = fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
        let doc = original
            .parse::<DocumentMut>()
            .map_err(|e| format!("{} is not valid TOML: {}", path.display(), e))?;

        debug!(path = %path.display(), "loaded manifest");
        Ok(Manifest {
            path: path.to_path_buf(),
            original,
            doc,
        })
    }

    /// Capture the text the manifest was loaded from
    pub fn snapshot(&self) -> ManifestSnapshot {
        ManifestSnapshot {
            path: self.path.clone(),
            contents: self.original.clone(),
        }
    }

    /// The raw version string, if the manifest declares one
    pub fn version_str(&self) -> Option<&str> {
        self.version_path()
            .and_then(|keys| lookup(self.doc.as_item(), keys))
            .and_then(Item::as_str)
    }

    /// The manifest version parsed as `MAJOR.MINOR.PATCH`
    pub fn version(&self) -> Result<Version> {
        let raw = self.version_str().ok_or_else(|| {
            ReleaseError::parse(format!(
                "{} has no [project] version field",
                self.path.display()
            ))
        })?;
        Version::parse(raw)
    }

    /// Replace the version value, keeping its quoting, spacing and comments
    pub fn set_version(&mut self, version: &Version) -> Result<()> {
        let keys = self.version_path().ok_or_else(|| {
            ReleaseError::write_at(&self.path, "no [project] version field to update")
        })?;
        let value = lookup_mut(self.doc.as_item_mut(), keys)
            .and_then(Item::as_value_mut)
            .ok_or_else(|| ReleaseError::write_at(&self.path, "version field is not a value"))?;

        let literal = value.to_string().trim_start().starts_with('\'');
        let mut replacement = if literal {
            format!("'{}'", version).parse::<Value>().map_err(|e| {
                ReleaseError::write_at(&self.path, format!("cannot render version: {}", e))
            })?
        } else {
            Value::from(version.to_string())
        };
        *replacement.decor_mut() = value.decor().clone();
        *value = replacement;
        Ok(())
    }

    /// Persist the document atomically
    ///
    /// Returns `false` without touching the file when nothing changed.
    pub fn write(&mut self) -> Result<bool> {
        let rendered = self.doc.to_string();
        if rendered == self.original {
            debug!(path = %self.path.display(), "manifest unchanged, skipping write");
            return Ok(false);
        }

        persist_atomically(&self.path, rendered.as_bytes())?;
        debug!(path = %self.path.display(), "manifest written");
        self.original = rendered;
        Ok(true)
    }

    /// Requirements from `[project].dependencies` and `[tool.rye].dev-dependencies`
    pub fn dependencies(&self) -> Dependencies {
        let root = self.doc.as_item();
        Dependencies {
            runtime: string_array(lookup(root, &["project", "dependencies"])),
            dev: string_array(lookup(root, &["tool", "rye", "dev-dependencies"])),
        }
    }

    /// Packages listed under `[tool.hatch.build.targets.wheel]`
    pub fn packages(&self) -> Vec<String> {
        string_array(lookup(self.doc.as_item(), WHEEL_PACKAGES_PATH))
    }

    /// Merge `new_packages` into the wheel package list
    ///
    /// Existing duplicates are dropped, first occurrence wins, and missing
    /// tables are created. Returns the packages that were not listed before.
    pub fn add_packages(&mut self, new_packages: &[String]) -> Result<Vec<String>> {
        let (parents, leaf) = WHEEL_PACKAGES_PATH
            .split_last()
            .map(|(leaf, parents)| (parents, *leaf))
            .ok_or_else(|| ReleaseError::write("empty package path"))?;

        let mut item = self.doc.as_item_mut();
        for key in parents {
            item = table_entry(item, key).map_err(|msg| ReleaseError::write_at(&self.path, msg))?;
        }
        let table = item
            .as_table_like_mut()
            .ok_or_else(|| ReleaseError::write_at(&self.path, "wheel target is not a table"))?;
        if table.get(leaf).is_none() {
            table.insert(leaf, toml_edit::value(Array::new()));
        }
        let packages = table
            .get_mut(leaf)
            .and_then(Item::as_array_mut)
            .ok_or_else(|| ReleaseError::write_at(&self.path, "wheel packages is not an array"))?;

        let mut seen = HashSet::new();
        packages.retain(|value| match value.as_str() {
            Some(name) => seen.insert(name.to_string()),
            None => true,
        });

        let mut added = Vec::new();
        for package in new_packages {
            if seen.insert(package.clone()) {
                packages.push(package.as_str());
                added.push(package.clone());
            }
        }
        Ok(added)
    }

    fn version_path(&self) -> Option<&'static [&'static str]> {
        VERSION_PATHS
            .iter()
            .copied()
            .find(|keys| lookup(self.doc.as_item(), keys).is_some_and(|item| !item.is_none()))
    }
}

/// Manifest text captured before a release rewrites the file
#[derive(Debug, Clone)]
pub struct ManifestSnapshot {
    path: PathBuf,
    contents: String,
}

impl ManifestSnapshot {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically put the captured text back in place
    pub fn restore(&self) -> Result<()> {
        persist_atomically(&self.path, self.contents.as_bytes())?;
        debug!(path = %self.path.display(), "manifest restored");
        Ok(())
    }
}

/// Rewrite the version field of the manifest at `path`
///
/// Any failure to read, parse or locate the field is reported as a write
/// error and leaves the file untouched. Calling this repeatedly with the
/// same version is a no-op after the first call.
pub fn write_manifest_version(path: impl AsRef<Path>, version: &Version) -> Result<bool> {
    let path = path.as_ref();
    let mut manifest = Manifest::read(path).map_err(ReleaseError::Write)?;
    manifest.set_version(version)?;
    manifest.write()
}

/// Write `contents` to a temporary file next to `path` and rename it into place
fn persist_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| ReleaseError::write_at(path, format!("cannot create temporary file: {}", e)))?;
    temp.write_all(contents)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| ReleaseError::write_at(path, format!("cannot write temporary file: {}", e)))?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions()).map_err(|e| {
            ReleaseError::write_at(path, format!("cannot copy permissions: {}", e))
        })?;
    }

    temp.persist(path)
        .map_err(|e| ReleaseError::write_at(path, format!("cannot replace file: {}", e.error)))?;
    Ok(())
}

fn lookup<'a>(item: &'a Item, keys: &[&str]) -> Option<&'a Item> {
    match keys.split_first() {
        None => Some(item),
        Some((first, rest)) => lookup(item.get(*first)?, rest),
    }
}

fn lookup_mut<'a>(item: &'a mut Item, keys: &[&str]) -> Option<&'a mut Item> {
    match keys.split_first() {
        None => Some(item),
        Some((first, rest)) => lookup_mut(item.get_mut(*first)?, rest),
    }
}

/// Descend into `key`, creating an implicit table when it is missing
fn table_entry<'a>(item: &'a mut Item, key: &str) -> std::result::Result<&'a mut Item, String> {
    let table = item
        .as_table_like_mut()
        .ok_or_else(|| format!("cannot descend into non-table to reach '{}'", key))?;
    if table.get(key).is_none() {
        let mut child = Table::new();
        child.set_implicit(true);
        table.insert(key, Item::Table(child));
    }
    table
        .get_mut(key)
        .ok_or_else(|| format!("cannot create table '{}'", key))
}

fn string_array(item: Option<&Item>) -> Vec<String> {
    item.and_then(Item::as_array)
        .map(|array| {
            array
                .iter()
                .filter_map(|value| value.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Split a PEP 508 requirement into its name and the rest of the specifier
pub fn split_requirement(requirement: &str) -> (&str, &str) {
    let requirement = requirement.trim();
    let end = requirement
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        .unwrap_or(requirement.len());
    (&requirement[..end], requirement[end..].trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"[project]
name = "httpx-utils"
version = "0.1.0"   # kept in sync with tags
description = "Helpers for httpx clients"
dependencies = [
    "httpx>=0.27.0",
    "pydantic-settings>=2.2.1",
]

[tool.rye]
managed = true
dev-dependencies = ["pytest>=8.1.1", "ruff>=0.4.1"]

[tool.hatch.build.targets.wheel]
packages = ["src/httpx_utils"]
"#;

    fn write_sample(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_reads_project_version() {
        let dir = TempDir::new().unwrap();
        let manifest = Manifest::load(write_sample(&dir, SAMPLE)).unwrap();
        assert_eq!(manifest.version_str(), Some("0.1.0"));
        assert_eq!(manifest.version().unwrap(), Version::new(0, 1, 0));
    }

    #[test]
    fn test_reads_poetry_version_as_fallback() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, "[tool.poetry]\nname = \"x\"\nversion = \"2.0.1\"\n");
        assert_eq!(Manifest::load(path).unwrap().version().unwrap(), Version::new(2, 0, 1));
    }

    #[test]
    fn test_missing_version_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, "[project]\nname = \"x\"\n");
        let err = Manifest::load(path).unwrap().version().unwrap_err();
        assert!(matches!(err, ReleaseError::Parse(_)));
    }

    #[test]
    fn test_malformed_version_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, "[project]\nversion = \"abc\"\n");
        let err = Manifest::load(path).unwrap().version().unwrap_err();
        assert!(matches!(err, ReleaseError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_parse_error_on_load() {
        let dir = TempDir::new().unwrap();
        let err = Manifest::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ReleaseError::Parse(_)));
    }

    #[test]
    fn test_write_version_only_changes_version_bytes() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, SAMPLE);

        assert!(write_manifest_version(&path, &Version::new(0, 1, 1)).unwrap());

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, SAMPLE.replace("\"0.1.0\"", "\"0.1.1\""));
    }

    #[test]
    fn test_write_version_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, SAMPLE);
        let target = Version::new(0, 2, 0);

        write_manifest_version(&path, &target).unwrap();
        let first = fs::read(&path).unwrap();
        assert!(!write_manifest_version(&path, &target).unwrap());
        let second = fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_write_keeps_literal_quotes() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, "[project]\nversion = '1.0.0'\n");
        write_manifest_version(&path, &Version::new(1, 0, 1)).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[project]\nversion = '1.0.1'\n"
        );
    }

    #[test]
    fn test_write_missing_file_is_write_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        let err = write_manifest_version(&path, &Version::new(0, 1, 1)).unwrap_err();
        assert!(matches!(err, ReleaseError::Write(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_write_invalid_toml_is_write_error_and_untouched() {
        let dir = TempDir::new().unwrap();
        let broken = "[project\nversion = \"0.1.0\"\n";
        let path = write_sample(&dir, broken);
        let err = write_manifest_version(&path, &Version::new(0, 1, 1)).unwrap_err();
        assert!(matches!(err, ReleaseError::Write(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), broken);
    }

    #[test]
    fn test_write_without_version_field_is_write_error() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, "[project]\nname = \"x\"\n");
        let err = write_manifest_version(&path, &Version::new(0, 1, 1)).unwrap_err();
        assert!(matches!(err, ReleaseError::Write(_)));
    }

    #[test]
    fn test_write_leaves_no_temporary_files() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, SAMPLE);
        write_manifest_version(&path, &Version::new(0, 1, 1)).unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_snapshot_restores_loaded_text() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, SAMPLE);
        let snapshot = Manifest::load(&path).unwrap().snapshot();

        write_manifest_version(&path, &Version::new(0, 2, 0)).unwrap();
        snapshot.restore().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
        assert_eq!(snapshot.path(), path.as_path());
    }

    #[test]
    fn test_dependencies() {
        let dir = TempDir::new().unwrap();
        let manifest = Manifest::load(write_sample(&dir, SAMPLE)).unwrap();
        let deps = manifest.dependencies();
        assert_eq!(deps.runtime, vec!["httpx>=0.27.0", "pydantic-settings>=2.2.1"]);
        assert_eq!(deps.dev, vec!["pytest>=8.1.1", "ruff>=0.4.1"]);
    }

    #[test]
    fn test_dependencies_absent() {
        let dir = TempDir::new().unwrap();
        let manifest = Manifest::load(write_sample(&dir, "[project]\nversion = \"0.1.0\"\n")).unwrap();
        assert_eq!(manifest.dependencies(), Dependencies::default());
    }

    #[test]
    fn test_add_packages_dedupes() {
        let dir = TempDir::new().unwrap();
        let mut manifest = Manifest::load(write_sample(&dir, SAMPLE)).unwrap();
        let added = manifest
            .add_packages(&[
                "src/httpx_utils".to_string(),
                "src/extras".to_string(),
                "src/extras".to_string(),
            ])
            .unwrap();
        assert_eq!(added, vec!["src/extras"]);
        assert_eq!(manifest.packages(), vec!["src/httpx_utils", "src/extras"]);
    }

    #[test]
    fn test_add_packages_creates_tables() {
        let dir = TempDir::new().unwrap();
        let path = write_sample(&dir, "[project]\nversion = \"0.1.0\"\n");
        let mut manifest = Manifest::load(&path).unwrap();
        manifest.add_packages(&["src/pkg".to_string()]).unwrap();
        assert!(manifest.write().unwrap());

        let reloaded = Manifest::load(&path).unwrap();
        assert_eq!(reloaded.packages(), vec!["src/pkg"]);
        assert_eq!(reloaded.version_str(), Some("0.1.0"));
    }

    #[test]
    fn test_split_requirement() {
        assert_eq!(split_requirement("httpx>=0.27.0"), ("httpx", ">=0.27.0"));
        assert_eq!(
            split_requirement("pydantic-settings >= 2.2"),
            ("pydantic-settings", ">= 2.2")
        );
        assert_eq!(split_requirement("requests"), ("requests", ""));
        assert_eq!(
            split_requirement("uvicorn[standard]==0.29"),
            ("uvicorn", "[standard]==0.29")
        );
    }
}
