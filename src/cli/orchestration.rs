//! Release workflow orchestration
//!
//! Each subcommand maps onto one function here. The functions take an
//! explicit [ReleaseContext] and, where git is involved, a
//! `&dyn Repository`, so they run the same against a real checkout and
//! against [crate::git::MockRepository]. [run] is the only place that
//! opens the real repository and prints results.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result as AnyResult};
use tracing::{debug, info, warn};

use crate::boundary::BoundaryWarning;
use crate::cli::{Cli, Command};
use crate::config::{self, Config};
use crate::domain::{Version, VersionBump};
use crate::error::{ReleaseError, Result};
use crate::git::{Git2Repository, Repository};
use crate::manifest::{Dependencies, Manifest, ManifestSnapshot};
use crate::packages;
use crate::resolver::{ensure_tag_available, Resolver};
use crate::ui;

/// Configuration and resolver for one invocation
#[derive(Debug, Clone)]
pub struct ReleaseContext {
    pub config: Config,
    pub resolver: Resolver,
}

impl ReleaseContext {
    /// Build a context, letting `manifest` override the configured path
    pub fn new(mut config: Config, manifest: Option<PathBuf>) -> Result<Self> {
        if let Some(manifest) = manifest {
            config.manifest = manifest;
        }
        let resolver = Resolver::from_config(&config)?;
        Ok(ReleaseContext { config, resolver })
    }

    /// Load configuration from disk and build a context
    pub fn load(config_path: Option<&Path>, manifest: Option<&Path>) -> Result<Self> {
        let config = config::load_config(config_path)?;
        Self::new(config, manifest.map(Path::to_path_buf))
    }

    /// Directory holding the manifest; git discovery starts here
    pub fn project_dir(&self) -> PathBuf {
        match self.resolver.manifest_path().parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Source directory, resolved against the manifest's directory
    pub fn src_dir(&self) -> PathBuf {
        self.project_dir().join(&self.config.src_dir)
    }

    pub fn open_repository(&self) -> Result<Git2Repository> {
        Git2Repository::open(self.project_dir())
    }

    fn remote<'a>(&'a self, remote: Option<&'a str>) -> &'a str {
        remote.unwrap_or(&self.config.remote)
    }
}

/// A release tag together with the version it was derived from
#[derive(Debug, Clone, PartialEq)]
pub struct TagResolution {
    pub tag: String,
    pub version: Version,
    pub warnings: Vec<BoundaryWarning>,
}

/// Result of rewriting (or previewing) the manifest version
#[derive(Debug, Clone, PartialEq)]
pub struct VersionUpdate {
    pub from: Version,
    pub to: Version,
    pub written: bool,
    pub warnings: Vec<BoundaryWarning>,
}

/// Options shared by the tagging commands
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishOptions {
    pub push: bool,
    pub remote: Option<String>,
    pub dry_run: bool,
}

/// Result of a tagging command
#[derive(Debug, Clone, PartialEq)]
pub struct TagOutcome {
    pub tag: String,
    pub version: Version,
    pub previous_tag: Option<String>,
    /// Version the manifest was bumped from, if it was bumped
    pub bumped_from: Option<Version>,
    /// Commit holding the manifest bump
    pub commit: Option<String>,
    pub pushed: bool,
    pub dry_run: bool,
    pub remote: String,
    pub warnings: Vec<BoundaryWarning>,
}

/// Result of syncing the wheel package list
#[derive(Debug, Clone, PartialEq)]
pub struct PackageUpdate {
    pub discovered: Vec<String>,
    pub added: Vec<String>,
    pub written: bool,
}

/// Resolve the current version
pub fn current_version(
    ctx: &ReleaseContext,
    repo: Option<&dyn Repository>,
) -> Result<TagResolution> {
    let resolution = ctx.resolver.current_version(repo)?;
    Ok(TagResolution {
        tag: ctx.resolver.format_tag(&resolution.version),
        version: resolution.version,
        warnings: resolution.warnings,
    })
}

/// Compute the release tag, optionally for a bumped version
///
/// Deterministic for a given manifest: both CI jobs derive the same tag.
pub fn release_tag(
    ctx: &ReleaseContext,
    repo: Option<&dyn Repository>,
    bump: Option<VersionBump>,
    check_unused: bool,
) -> Result<TagResolution> {
    let mut resolution = current_version(ctx, repo)?;
    if let Some(bump) = bump {
        resolution.version = ctx.resolver.next_version(resolution.version, bump)?;
        resolution.tag = ctx.resolver.format_tag(&resolution.version);
    }

    if check_unused {
        let repo = repo.ok_or_else(|| {
            ReleaseError::config("checking for an existing tag requires a git repository")
        })?;
        ensure_tag_available(repo, &resolution.tag)?;
    }

    Ok(resolution)
}

/// Bump the manifest version
pub fn update_version(
    ctx: &ReleaseContext,
    repo: Option<&dyn Repository>,
    bump: VersionBump,
    dry_run: bool,
) -> Result<VersionUpdate> {
    let resolution = ctx.resolver.current_version(repo)?;
    let from = resolution.version;
    let to = ctx.resolver.next_version(from, bump)?;

    let written = if dry_run {
        false
    } else {
        ctx.resolver.write_manifest_version(&to)?
    };

    Ok(VersionUpdate {
        from,
        to,
        written,
        warnings: resolution.warnings,
    })
}

/// Bump the patch version, commit the manifest and tag the release
///
/// When no release tag exists yet the current manifest version is tagged
/// as-is, so the first release keeps the version the project started with.
pub fn patch_version_and_tag(
    ctx: &ReleaseContext,
    repo: &dyn Repository,
    options: &PublishOptions,
) -> Result<TagOutcome> {
    let remote = ctx.remote(options.remote.as_deref()).to_string();
    let mut warnings = fetch_if_pushing(repo, &remote, options.push);

    let resolution = ctx.resolver.current_version(Some(repo))?;
    warnings.extend(resolution.warnings);

    let (version, bumped_from) = match resolution.latest_tag {
        Some(_) => (
            ctx.resolver.next_version(resolution.version, VersionBump::Patch)?,
            Some(resolution.version),
        ),
        None => {
            info!(version = %resolution.version, "no release tags yet, tagging current version");
            (resolution.version, None)
        }
    };

    publish(
        ctx,
        repo,
        PublishPlan {
            version,
            bumped_from,
            previous_tag: resolution.latest_tag.map(|latest| latest.tag),
            remote,
            warnings,
        },
        options,
    )
}

/// Tag the current version without touching the manifest
pub fn create_release_tag(
    ctx: &ReleaseContext,
    repo: &dyn Repository,
    options: &PublishOptions,
) -> Result<TagOutcome> {
    let remote = ctx.remote(options.remote.as_deref()).to_string();
    let mut warnings = fetch_if_pushing(repo, &remote, options.push);

    let resolution = ctx.resolver.current_version(Some(repo))?;
    warnings.extend(resolution.warnings);

    publish(
        ctx,
        repo,
        PublishPlan {
            version: resolution.version,
            bumped_from: None,
            previous_tag: resolution.latest_tag.map(|latest| latest.tag),
            remote,
            warnings,
        },
        options,
    )
}

struct PublishPlan {
    version: Version,
    bumped_from: Option<Version>,
    previous_tag: Option<String>,
    remote: String,
    warnings: Vec<BoundaryWarning>,
}

fn fetch_if_pushing(repo: &dyn Repository, remote: &str, push: bool) -> Vec<BoundaryWarning> {
    if !push {
        return Vec::new();
    }
    match repo.fetch_tags(remote) {
        Ok(()) => Vec::new(),
        Err(e) => vec![BoundaryWarning::FetchFailed {
            remote: remote.to_string(),
            reason: e.to_string(),
        }],
    }
}

fn publish(
    ctx: &ReleaseContext,
    repo: &dyn Repository,
    plan: PublishPlan,
    options: &PublishOptions,
) -> Result<TagOutcome> {
    let tag = ctx.resolver.format_tag(&plan.version);

    // Nothing is written before this check passes
    ensure_tag_available(repo, &tag)?;

    let mut outcome = TagOutcome {
        tag,
        version: plan.version,
        previous_tag: plan.previous_tag,
        bumped_from: plan.bumped_from,
        commit: None,
        pushed: false,
        dry_run: options.dry_run,
        remote: plan.remote,
        warnings: plan.warnings,
    };

    if options.dry_run {
        debug!(tag = %outcome.tag, "dry run, no changes made");
        return Ok(outcome);
    }

    // Taken before the rewrite so a failed commit or tag can be undone
    let snapshot = match outcome.bumped_from {
        Some(_) => Some(Manifest::load(ctx.resolver.manifest_path())?.snapshot()),
        None => None,
    };

    if let Err(e) = record_release(ctx, repo, &mut outcome) {
        if let Some(snapshot) = &snapshot {
            roll_back(snapshot, outcome.commit.as_deref());
        }
        return Err(e);
    }

    if options.push {
        repo.push_tag(&outcome.remote, &outcome.tag)?;
        outcome.pushed = true;
        info!(tag = %outcome.tag, remote = %outcome.remote, "pushed release tag");
    }

    Ok(outcome)
}

/// Write and commit the bumped manifest, then tag HEAD
fn record_release(
    ctx: &ReleaseContext,
    repo: &dyn Repository,
    outcome: &mut TagOutcome,
) -> Result<()> {
    if outcome.bumped_from.is_some() && ctx.resolver.write_manifest_version(&outcome.version)? {
        let message = ctx
            .config
            .render_commit_message(&outcome.tag, &outcome.version);
        outcome.commit = Some(repo.commit_file(ctx.resolver.manifest_path(), &message)?);
    }

    let message = ctx.config.render_tag_message(&outcome.tag, &outcome.version);
    repo.create_annotated_tag(&outcome.tag, &message)?;
    match repo.current_branch()? {
        Some(branch) => info!(tag = %outcome.tag, branch = %branch, "created release tag"),
        None => info!(tag = %outcome.tag, "created release tag on detached HEAD"),
    }
    Ok(())
}

fn roll_back(snapshot: &ManifestSnapshot, commit: Option<&str>) {
    match snapshot.restore() {
        Ok(()) => warn!(path = %snapshot.path().display(), "release failed, manifest restored"),
        Err(e) => warn!(
            path = %snapshot.path().display(),
            error = %e,
            "release failed and the manifest could not be restored"
        ),
    }
    if let Some(commit) = commit {
        warn!(commit, "version bump commit remains on HEAD");
    }
}

/// Dependencies declared in the manifest
pub fn dependencies(ctx: &ReleaseContext) -> Result<Dependencies> {
    Ok(Manifest::load(ctx.resolver.manifest_path())?.dependencies())
}

/// Add packages discovered under the source directory to the wheel target
///
/// A relative `src` is taken relative to the manifest's directory, like the
/// configured `src_dir`. Package entries are always written relative to
/// that directory.
pub fn update_pyproject(
    ctx: &ReleaseContext,
    src: Option<&Path>,
    dry_run: bool,
) -> Result<PackageUpdate> {
    let src_dir = match src {
        Some(src) => ctx.project_dir().join(src),
        None => ctx.src_dir(),
    };
    let prefix = relative_to_project(&ctx.project_dir(), &src_dir)?;

    let discovered = packages::discover_packages(&src_dir, &prefix)?;
    let mut manifest = Manifest::load(ctx.resolver.manifest_path())?;
    let added = manifest.add_packages(&discovered)?;

    let written = if dry_run { false } else { manifest.write()? };

    Ok(PackageUpdate {
        discovered,
        added,
        written,
    })
}

/// `dir` as a `/`-separated path below `project_dir`
fn relative_to_project(project_dir: &Path, dir: &Path) -> Result<String> {
    let base = project_dir.canonicalize()?;
    let target = dir.canonicalize().map_err(|e| {
        ReleaseError::config(format!("cannot read source directory {}: {}", dir.display(), e))
    })?;
    let relative = target.strip_prefix(&base).map_err(|_| {
        ReleaseError::config(format!(
            "source directory {} is outside the project at {}",
            dir.display(),
            base.display()
        ))
    })?;

    Ok(relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Execute a parsed command line
pub fn run(cli: Cli) -> AnyResult<()> {
    let ctx = ReleaseContext::load(cli.config.as_deref(), cli.manifest.as_deref())
        .context("failed to load configuration")?;
    let manifest_name = ctx.resolver.manifest_path().display().to_string();

    match cli.command {
        Command::ReleaseTag { bump, check_unused } => {
            let repo = open_if(&ctx, check_unused || ctx.resolver.needs_repository())?;
            let resolution = release_tag(&ctx, as_dyn(&repo), bump, check_unused)
                .context("failed to resolve release tag")?;
            ui::display_boundary_warnings(&resolution.warnings);
            println!("{}", resolution.tag);
        }
        Command::CurrentVersion => {
            let repo = open_if(&ctx, ctx.resolver.needs_repository())?;
            let resolution =
                current_version(&ctx, as_dyn(&repo)).context("failed to read current version")?;
            ui::display_boundary_warnings(&resolution.warnings);
            println!("{}", resolution.version);
        }
        Command::UpdateVersion { bump, dry_run } => {
            let repo = open_if(&ctx, ctx.resolver.needs_repository())?;
            let update = update_version(&ctx, as_dyn(&repo), bump, dry_run)
                .with_context(|| format!("failed to update {}", manifest_name))?;
            report_version_update(&manifest_name, &update, dry_run);
        }
        Command::PatchVersion {
            tag: false,
            dry_run,
            ..
        } => {
            let repo = open_if(&ctx, ctx.resolver.needs_repository())?;
            let update = update_version(&ctx, as_dyn(&repo), VersionBump::Patch, dry_run)
                .with_context(|| format!("failed to update {}", manifest_name))?;
            report_version_update(&manifest_name, &update, dry_run);
        }
        Command::PatchVersion {
            tag: true,
            push,
            remote,
            dry_run,
        } => {
            let repo = ctx.open_repository().context("failed to open git repository")?;
            let options = PublishOptions {
                push,
                remote,
                dry_run,
            };
            let outcome = patch_version_and_tag(&ctx, &repo, &options)
                .context("failed to publish patch release")?;
            report_tag_outcome(&manifest_name, &outcome, push);
        }
        Command::Tag {
            push,
            remote,
            dry_run,
        } => {
            let repo = ctx.open_repository().context("failed to open git repository")?;
            let options = PublishOptions {
                push,
                remote,
                dry_run,
            };
            let outcome =
                create_release_tag(&ctx, &repo, &options).context("failed to create release tag")?;
            report_tag_outcome(&manifest_name, &outcome, push);
        }
        Command::Deps => {
            let deps = dependencies(&ctx).context("failed to read dependencies")?;
            ui::display_dependencies(&deps);
        }
        Command::UpdatePyproject { src, dry_run } => {
            let update = update_pyproject(&ctx, src.as_deref(), dry_run)
                .with_context(|| format!("failed to update packages in {}", manifest_name))?;
            if update.added.is_empty() {
                ui::display_status(&format!(
                    "{} already lists all {} package(s)",
                    manifest_name,
                    update.discovered.len()
                ));
            } else {
                for package in &update.added {
                    let verb = if dry_run { "Would add" } else { "Added" };
                    ui::display_success(&format!("{} package {}", verb, package));
                }
            }
        }
    }

    Ok(())
}

fn open_if(ctx: &ReleaseContext, required: bool) -> AnyResult<Option<Git2Repository>> {
    if !required {
        return Ok(None);
    }
    let repo = ctx
        .open_repository()
        .context("failed to open git repository")?;
    Ok(Some(repo))
}

fn as_dyn(repo: &Option<Git2Repository>) -> Option<&dyn Repository> {
    repo.as_ref().map(|repo| repo as &dyn Repository)
}

fn report_version_update(manifest: &str, update: &VersionUpdate, dry_run: bool) {
    ui::display_boundary_warnings(&update.warnings);
    if dry_run {
        ui::display_status(&format!(
            "Dry run: would update {} from {} to {}",
            manifest, update.from, update.to
        ));
    } else {
        ui::display_version_change(manifest, &update.from, &update.to);
    }
}

fn report_tag_outcome(manifest: &str, outcome: &TagOutcome, push: bool) {
    ui::display_boundary_warnings(&outcome.warnings);
    ui::display_proposed_tag(outcome.previous_tag.as_deref(), &outcome.tag);

    if outcome.dry_run {
        ui::display_status("Dry run, no changes made:");
        if let Some(from) = outcome.bumped_from {
            ui::display_success(&format!(
                "  would update {} from {} to {} and commit it",
                manifest, from, outcome.version
            ));
        }
        ui::display_success(&format!("  would create annotated tag {}", outcome.tag));
        if push {
            ui::display_success(&format!(
                "  would push {} to {}",
                outcome.tag, outcome.remote
            ));
        }
        return;
    }

    if let Some(from) = outcome.bumped_from {
        ui::display_version_change(manifest, &from, &outcome.version);
    }
    if let Some(commit) = &outcome.commit {
        ui::display_success(&format!("Committed {} ({})", manifest, &commit[..commit.len().min(7)]));
    }
    ui::display_success(&format!("Created tag: {}", outcome.tag));

    if outcome.pushed {
        ui::display_success(&format!("Pushed tag {} to {}", outcome.tag, outcome.remote));
    } else {
        ui::display_manual_push_instruction(&outcome.tag, &outcome.remote);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::MockRepository;
    use std::fs;
    use tempfile::TempDir;

    fn context_with(version: &str) -> (TempDir, ReleaseContext) {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("pyproject.toml");
        fs::write(
            &manifest,
            format!(
                "[project]\nname = \"httpx-utils\"\nversion = \"{}\"\n",
                version
            ),
        )
        .unwrap();
        let ctx = ReleaseContext::new(Config::default(), Some(manifest)).unwrap();
        (dir, ctx)
    }

    #[test]
    fn test_release_tag_is_stable_across_calls() {
        let (_dir, ctx) = context_with("0.1.1");
        let first = release_tag(&ctx, None, None, false).unwrap();
        let second = release_tag(&ctx, None, None, false).unwrap();
        assert_eq!(first.tag, "v0.1.1");
        assert_eq!(first, second);
    }

    #[test]
    fn test_release_tag_with_bump() {
        let (_dir, ctx) = context_with("0.1.1");
        let resolution = release_tag(&ctx, None, Some(VersionBump::Minor), false).unwrap();
        assert_eq!(resolution.tag, "v0.2.0");
    }

    #[test]
    fn test_release_tag_check_unused() {
        let (_dir, ctx) = context_with("0.1.1");
        let repo = MockRepository::new().with_tag("v0.1.1");
        let err = release_tag(&ctx, Some(&repo), None, true).unwrap_err();
        assert!(matches!(err, ReleaseError::TagConflict { .. }));

        assert!(release_tag(&ctx, None, None, true).is_err());
    }

    #[test]
    fn test_update_version_dry_run_leaves_file() {
        let (dir, ctx) = context_with("0.1.0");
        let path = dir.path().join("pyproject.toml");
        let before = fs::read(&path).unwrap();

        let update = update_version(&ctx, None, VersionBump::Patch, true).unwrap();
        assert_eq!(update.to, Version::new(0, 1, 1));
        assert!(!update.written);
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_patch_version_first_release_tags_current_version() {
        let (dir, ctx) = context_with("0.1.0");
        let repo = MockRepository::new();

        let outcome = patch_version_and_tag(&ctx, &repo, &PublishOptions::default()).unwrap();
        assert_eq!(outcome.tag, "v0.1.0");
        assert_eq!(outcome.bumped_from, None);
        assert!(repo.commits().is_empty());
        assert_eq!(repo.tag_message("v0.1.0").as_deref(), Some("Release v0.1.0"));

        let manifest = fs::read_to_string(dir.path().join("pyproject.toml")).unwrap();
        assert!(manifest.contains("version = \"0.1.0\""));
    }

    #[test]
    fn test_patch_version_bumps_commits_tags_and_pushes() {
        let (dir, ctx) = context_with("0.1.0");
        let repo = MockRepository::new().with_tag("v0.1.0");
        let options = PublishOptions {
            push: true,
            ..Default::default()
        };

        let outcome = patch_version_and_tag(&ctx, &repo, &options).unwrap();
        assert_eq!(outcome.tag, "v0.1.1");
        assert_eq!(outcome.bumped_from, Some(Version::new(0, 1, 0)));
        assert_eq!(outcome.previous_tag.as_deref(), Some("v0.1.0"));
        assert!(outcome.pushed);
        assert_eq!(repo.fetch_count(), 1);
        assert_eq!(
            repo.commits(),
            vec![(
                dir.path().join("pyproject.toml"),
                "Bump version to 0.1.1".to_string()
            )]
        );
        assert_eq!(
            repo.pushed(),
            vec![("origin".to_string(), "v0.1.1".to_string())]
        );

        let manifest = fs::read_to_string(dir.path().join("pyproject.toml")).unwrap();
        assert!(manifest.contains("version = \"0.1.1\""));
    }

    #[test]
    fn test_patch_version_conflict_leaves_manifest_untouched() {
        let (dir, ctx) = context_with("0.1.0");
        let repo = MockRepository::new().with_tag("v0.1.0").with_tag("v0.1.1");
        let path = dir.path().join("pyproject.toml");
        let before = fs::read(&path).unwrap();

        let err = patch_version_and_tag(&ctx, &repo, &PublishOptions::default()).unwrap_err();
        assert!(matches!(err, ReleaseError::TagConflict { ref tag } if tag == "v0.1.1"));
        assert_eq!(fs::read(&path).unwrap(), before);
        assert!(repo.commits().is_empty());
    }

    #[test]
    fn test_patch_version_dry_run_changes_nothing() {
        let (dir, ctx) = context_with("0.1.0");
        let repo = MockRepository::new().with_tag("v0.1.0");
        let path = dir.path().join("pyproject.toml");
        let before = fs::read(&path).unwrap();
        let options = PublishOptions {
            dry_run: true,
            ..Default::default()
        };

        let outcome = patch_version_and_tag(&ctx, &repo, &options).unwrap();
        assert_eq!(outcome.tag, "v0.1.1");
        assert!(outcome.dry_run);
        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(repo.list_tags().unwrap(), vec!["v0.1.0"]);
    }

    #[test]
    fn test_failed_commit_restores_manifest() {
        let (dir, ctx) = context_with("0.1.0");
        let repo = MockRepository::new().with_tag("v0.1.0").failing_commit();
        let path = dir.path().join("pyproject.toml");
        let before = fs::read(&path).unwrap();

        let err = patch_version_and_tag(&ctx, &repo, &PublishOptions::default()).unwrap_err();
        assert!(matches!(err, ReleaseError::Git(_)));
        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(repo.list_tags().unwrap(), vec!["v0.1.0"]);

        // A retry still targets the skipped release
        let resolution = release_tag(&ctx, None, Some(VersionBump::Patch), false).unwrap();
        assert_eq!(resolution.tag, "v0.1.1");
    }

    #[test]
    fn test_failed_tag_restores_manifest() {
        let (dir, ctx) = context_with("0.1.0");
        let repo = MockRepository::new().with_tag("v0.1.0").failing_tag();
        let path = dir.path().join("pyproject.toml");
        let before = fs::read(&path).unwrap();
        let options = PublishOptions {
            push: true,
            ..Default::default()
        };

        assert!(patch_version_and_tag(&ctx, &repo, &options).is_err());
        assert_eq!(fs::read(&path).unwrap(), before);
        assert!(repo.pushed().is_empty());
    }

    #[test]
    fn test_failed_push_keeps_release() {
        let (dir, ctx) = context_with("0.1.0");
        let repo = MockRepository::new().with_tag("v0.1.0").failing_push();
        let options = PublishOptions {
            push: true,
            ..Default::default()
        };

        assert!(patch_version_and_tag(&ctx, &repo, &options).is_err());
        // The tag and commit exist locally, so the bumped manifest stays
        let manifest = fs::read_to_string(dir.path().join("pyproject.toml")).unwrap();
        assert!(manifest.contains("version = \"0.1.1\""));
        assert!(repo.tag_exists("v0.1.1").unwrap());
    }

    #[test]
    fn test_fetch_failure_is_warning() {
        let (_dir, ctx) = context_with("0.3.0");
        let repo = MockRepository::new().failing_fetch();
        let options = PublishOptions {
            push: true,
            remote: Some("upstream".to_string()),
            dry_run: false,
        };

        let outcome = create_release_tag(&ctx, &repo, &options).unwrap();
        assert_eq!(outcome.tag, "v0.3.0");
        assert!(outcome.pushed);
        assert!(matches!(
            outcome.warnings.as_slice(),
            [BoundaryWarning::FetchFailed { remote, .. }] if remote == "upstream"
        ));
    }

    #[test]
    fn test_push_failure_is_error() {
        let (_dir, ctx) = context_with("0.3.0");
        let repo = MockRepository::new().failing_push();
        let options = PublishOptions {
            push: true,
            ..Default::default()
        };

        let err = create_release_tag(&ctx, &repo, &options).unwrap_err();
        assert!(matches!(err, ReleaseError::Remote(_)));
    }

    #[test]
    fn test_create_release_tag_conflict() {
        let (_dir, ctx) = context_with("0.3.0");
        let repo = MockRepository::new().with_tag("v0.3.0");
        let err = create_release_tag(&ctx, &repo, &PublishOptions::default()).unwrap_err();
        assert!(matches!(err, ReleaseError::TagConflict { .. }));
    }

    #[test]
    fn test_update_pyproject_adds_discovered_packages() {
        let (dir, ctx) = context_with("0.1.0");
        let pkg = dir.path().join("src").join("httpx_utils");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("__init__.py"), "").unwrap();

        let update = update_pyproject(&ctx, None, false).unwrap();
        assert_eq!(update.added, vec!["src/httpx_utils"]);
        assert!(update.written);

        let again = update_pyproject(&ctx, None, false).unwrap();
        assert!(again.added.is_empty());
        assert!(!again.written);
    }

    #[test]
    fn test_update_pyproject_explicit_src_is_manifest_relative() {
        let (dir, ctx) = context_with("0.1.0");
        let pkg = dir.path().join("lib").join("httpx_utils");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("__init__.py"), "").unwrap();

        // Absolute path
        let update = update_pyproject(&ctx, Some(&dir.path().join("lib")), true).unwrap();
        assert_eq!(update.added, vec!["lib/httpx_utils"]);

        // Relative path, resolved against the manifest's directory
        let update = update_pyproject(&ctx, Some(Path::new("lib")), false).unwrap();
        assert_eq!(update.added, vec!["lib/httpx_utils"]);

        let manifest = Manifest::load(dir.path().join("pyproject.toml")).unwrap();
        assert_eq!(manifest.packages(), vec!["lib/httpx_utils"]);
    }

    #[test]
    fn test_update_pyproject_src_outside_project_is_error() {
        let (_dir, ctx) = context_with("0.1.0");
        let elsewhere = TempDir::new().unwrap();
        let pkg = elsewhere.path().join("pkg");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("__init__.py"), "").unwrap();

        let err = update_pyproject(&ctx, Some(elsewhere.path()), false).unwrap_err();
        assert!(matches!(err, ReleaseError::Config(_)));
    }

    #[test]
    fn test_dependencies_reads_manifest() {
        let (_dir, ctx) = context_with("0.1.0");
        assert_eq!(dependencies(&ctx).unwrap(), Dependencies::default());
    }
}
