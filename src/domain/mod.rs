//! Domain logic - pure release rules independent of git and the filesystem

pub mod tag;
pub mod version;

pub use tag::{is_valid_tag_name, TagPattern, DEFAULT_TAG_PATTERN};
pub use version::{Version, VersionBump};
