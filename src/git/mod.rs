//! Git operations abstraction layer
//!
//! The release workflow only needs a handful of git operations: listing
//! tags, committing the rewritten manifest, creating an annotated tag and
//! pushing it. They are expressed by the [Repository] trait so the
//! orchestration code can run against either implementation:
//!
//! - [repository::Git2Repository]: a real repository through `git2`
//! - [mock::MockRepository]: an in-memory stand-in for tests

pub mod mock;
pub mod repository;

pub use mock::MockRepository;
pub use repository::Git2Repository;

use std::path::Path;

use crate::error::Result;

/// Git operations used by the release workflow
///
/// All methods return [crate::error::Result]. Implementations map
/// underlying failures onto [crate::error::ReleaseError] variants; in
/// particular an attempt to create an existing tag must surface as
/// [crate::error::ReleaseError::TagConflict].
pub trait Repository {
    /// All tag names, sorted alphabetically
    fn list_tags(&self) -> Result<Vec<String>>;

    /// Whether a tag with this exact name exists
    fn tag_exists(&self, name: &str) -> Result<bool> {
        Ok(self.list_tags()?.iter().any(|tag| tag == name))
    }

    /// Short name of the checked-out branch, `None` when HEAD is detached
    fn current_branch(&self) -> Result<Option<String>>;

    /// Stage `path` and commit it on top of HEAD, returning the new commit id
    fn commit_file(&self, path: &Path, message: &str) -> Result<String>;

    /// Create an annotated tag on HEAD
    ///
    /// Never replaces an existing tag.
    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()>;

    /// Push a single tag to `remote`
    fn push_tag(&self, remote: &str, name: &str) -> Result<()>;

    /// Fetch all tags from `remote`
    fn fetch_tags(&self, remote: &str) -> Result<()>;
}
