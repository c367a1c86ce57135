use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{ReleaseError, Result};
use crate::git::Repository;

/// Mock repository for testing without actual git operations
///
/// Records every mutating call so tests can assert on what the workflow
/// asked git to do.
#[derive(Debug, Default)]
pub struct MockRepository {
    tags: RefCell<BTreeMap<String, String>>,
    branch: Option<String>,
    commits: RefCell<Vec<(PathBuf, String)>>,
    pushed: RefCell<Vec<(String, String)>>,
    fetches: Cell<usize>,
    fail_fetch: bool,
    fail_push: bool,
    fail_commit: bool,
    fail_tag: bool,
}

impl MockRepository {
    /// Create a new empty mock repository on branch `main`
    pub fn new() -> Self {
        MockRepository {
            branch: Some("main".to_string()),
            ..Default::default()
        }
    }

    /// Add an existing tag
    pub fn with_tag(self, name: impl Into<String>) -> Self {
        self.tags
            .borrow_mut()
            .insert(name.into(), String::new());
        self
    }

    /// Make every fetch fail
    pub fn failing_fetch(mut self) -> Self {
        self.fail_fetch = true;
        self
    }

    /// Make every push fail
    pub fn failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    /// Make every commit fail
    pub fn failing_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Make every tag creation fail, after the conflict check
    pub fn failing_tag(mut self) -> Self {
        self.fail_tag = true;
        self
    }

    /// Message of an annotated tag created through the trait
    pub fn tag_message(&self, name: &str) -> Option<String> {
        self.tags.borrow().get(name).cloned()
    }

    /// Commits recorded as `(path, message)`
    pub fn commits(&self) -> Vec<(PathBuf, String)> {
        self.commits.borrow().clone()
    }

    /// Pushes recorded as `(remote, tag)`
    pub fn pushed(&self) -> Vec<(String, String)> {
        self.pushed.borrow().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }
}

impl Repository for MockRepository {
    fn list_tags(&self) -> Result<Vec<String>> {
        Ok(self.tags.borrow().keys().cloned().collect())
    }

    fn current_branch(&self) -> Result<Option<String>> {
        Ok(self.branch.clone())
    }

    fn commit_file(&self, path: &Path, message: &str) -> Result<String> {
        if self.fail_commit {
            return Err(git2::Error::from_str("index.lock exists").into());
        }
        let mut commits = self.commits.borrow_mut();
        commits.push((path.to_path_buf(), message.to_string()));
        Ok(format!("{:040x}", commits.len()))
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        let mut tags = self.tags.borrow_mut();
        if tags.contains_key(name) {
            return Err(ReleaseError::tag_conflict(name));
        }
        if self.fail_tag {
            return Err(git2::Error::from_str("cannot lock ref").into());
        }
        tags.insert(name.to_string(), message.to_string());
        Ok(())
    }

    fn push_tag(&self, remote: &str, name: &str) -> Result<()> {
        if self.fail_push {
            return Err(ReleaseError::remote(format!("push to '{}' refused", remote)));
        }
        if !self.tags.borrow().contains_key(name) {
            return Err(ReleaseError::remote(format!("no such tag '{}'", name)));
        }
        self.pushed
            .borrow_mut()
            .push((remote.to_string(), name.to_string()));
        Ok(())
    }

    fn fetch_tags(&self, remote: &str) -> Result<()> {
        self.fetches.set(self.fetches.get() + 1);
        if self.fail_fetch {
            return Err(ReleaseError::remote(format!(
                "authentication failed for '{}'",
                remote
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_tags_are_sorted() {
        let repo = MockRepository::new().with_tag("v0.2.0").with_tag("v0.1.0");
        assert_eq!(repo.list_tags().unwrap(), vec!["v0.1.0", "v0.2.0"]);
        assert!(repo.tag_exists("v0.1.0").unwrap());
    }

    #[test]
    fn test_mock_refuses_duplicate_tag() {
        let repo = MockRepository::new().with_tag("v0.1.0");
        let err = repo.create_annotated_tag("v0.1.0", "again").unwrap_err();
        assert!(matches!(err, ReleaseError::TagConflict { .. }));
    }

    #[test]
    fn test_mock_failing_commit_and_tag() {
        let repo = MockRepository::new().failing_commit().failing_tag();
        assert!(repo.commit_file(Path::new("pyproject.toml"), "bump").is_err());
        assert!(repo.commits().is_empty());

        let err = repo.create_annotated_tag("v1.0.0", "Release v1.0.0").unwrap_err();
        assert!(matches!(err, ReleaseError::Git(_)));
        assert!(repo.list_tags().unwrap().is_empty());
    }

    #[test]
    fn test_mock_records_pushes() {
        let repo = MockRepository::new();
        repo.create_annotated_tag("v1.0.0", "Release v1.0.0").unwrap();
        repo.push_tag("origin", "v1.0.0").unwrap();
        assert_eq!(
            repo.pushed(),
            vec![("origin".to_string(), "v1.0.0".to_string())]
        );
        assert_eq!(repo.tag_message("v1.0.0").as_deref(), Some("Release v1.0.0"));
    }
}
