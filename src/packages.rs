//! Discovery of Python packages under the source directory.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::Result;

/// Marker file that turns a directory into a package
const PACKAGE_MARKER: &str = "__init__.py";

/// List packages below `src_dir` as manifest-relative paths (`src/<pkg>`)
///
/// A directory holding `__init__.py` is reported and not descended into;
/// other directories are searched recursively. Hidden directories and
/// `__pycache__` are skipped. The result is sorted.
pub fn discover_packages(src_dir: &Path, prefix: &str) -> Result<Vec<String>> {
    let mut packages = Vec::new();
    walk(src_dir, prefix.trim_end_matches('/'), &mut packages)?;
    packages.sort();
    debug!(count = packages.len(), dir = %src_dir.display(), "discovered packages");
    Ok(packages)
}

fn walk(dir: &Path, relative: &str, packages: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || name == "__pycache__" {
            continue;
        }

        let path = entry.path();
        let child = if relative.is_empty() {
            name
        } else {
            format!("{}/{}", relative, name)
        };
        if path.join(PACKAGE_MARKER).is_file() {
            packages.push(child);
        } else {
            walk(&path, &child, packages)?;
        }
    }
    Ok(())
}
