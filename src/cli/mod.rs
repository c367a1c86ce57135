//! Command-line surface.
//!
//! The argument model lives here; [orchestration] turns parsed arguments
//! into calls on the resolver, the manifest and git.

pub mod orchestration;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::VersionBump;

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(
    name = "pyproject-release",
    version,
    about = "Compute release tags and keep the pyproject.toml version in sync"
)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        help = "Manifest to operate on [default: pyproject.toml]"
    )]
    pub manifest: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Print diagnostic logs to stderr")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the release tag for the current version
    ReleaseTag {
        #[arg(long, ignore_case = true, help = "Print the tag the given bump would produce")]
        bump: Option<VersionBump>,

        #[arg(long, help = "Fail if the tag already exists")]
        check_unused: bool,
    },

    /// Bump the manifest version in place
    #[command(alias = "update-pyproject-version")]
    UpdateVersion {
        #[arg(default_value = "patch", ignore_case = true, help = "Component to bump")]
        bump: VersionBump,

        #[arg(long, help = "Preview what would happen without making changes")]
        dry_run: bool,
    },

    /// Bump the patch version; optionally commit, tag and push the release
    PatchVersion {
        #[arg(long, help = "Commit the manifest and create an annotated tag")]
        tag: bool,

        #[arg(long, requires = "tag", help = "Push the new tag to the remote")]
        push: bool,

        #[arg(long, help = "Remote to fetch from and push to [default: from config]")]
        remote: Option<String>,

        #[arg(long, help = "Preview what would happen without making changes")]
        dry_run: bool,
    },

    /// Print the current version
    CurrentVersion,

    /// Create an annotated tag for the current version
    Tag {
        #[arg(long, help = "Push the new tag to the remote")]
        push: bool,

        #[arg(long, help = "Remote to fetch from and push to [default: from config]")]
        remote: Option<String>,

        #[arg(long, help = "Preview what would happen without making changes")]
        dry_run: bool,
    },

    /// List runtime and development dependencies
    Deps,

    /// Add packages found under the source directory to the wheel target
    UpdatePyproject {
        #[arg(long, help = "Source directory to scan [default: from config]")]
        src: Option<PathBuf>,

        #[arg(long, help = "Preview what would happen without making changes")]
        dry_run: bool,
    },
}
