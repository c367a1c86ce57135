pub mod boundary;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod manifest;
pub mod packages;
pub mod resolver;
pub mod ui;

pub use domain::{TagPattern, Version, VersionBump};
pub use error::{ReleaseError, Result};
pub use manifest::write_manifest_version;
pub use resolver::{format_tag, next_version, Resolver, VersionSource};
