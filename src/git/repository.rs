use std::path::{Path, PathBuf};

use git2::{ErrorCode, IndexEntry, IndexTime, ObjectType, Oid, Repository as Git2Repo, Signature};
use tracing::{debug, warn};

use crate::error::{ReleaseError, Result};

/// Refspec mirroring every remote tag locally
const TAG_REFSPEC: &str = "+refs/tags/*:refs/tags/*";

/// Identity used when the repository has no `user.name`/`user.email`
const FALLBACK_NAME: &str = "pyproject-release";
const FALLBACK_EMAIL: &str = "pyproject-release@localhost";

/// Mode of a regular, non-executable file
const BLOB_MODE: u32 = 0o100644;

/// Give up after this many credential prompts from libgit2
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Wrapper around git2::Repository with our trait interface
pub struct Git2Repository {
    repo: Git2Repo,
}

impl Git2Repository {
    /// Open or discover a git repository
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Git2Repo::discover(path)?;
        debug!(path = %repo.path().display(), "opened git repository");
        Ok(Git2Repository { repo })
    }

    /// Create from existing git2::Repository
    pub fn from_git2(repo: Git2Repo) -> Self {
        Git2Repository { repo }
    }

    fn signature(&self) -> Result<Signature<'static>> {
        match self.repo.signature() {
            Ok(signature) => Ok(signature),
            Err(e) => {
                warn!(error = %e, "no git identity configured, using fallback signature");
                Ok(Signature::now(FALLBACK_NAME, FALLBACK_EMAIL)?)
            }
        }
    }

    fn relative_to_workdir(&self, path: &Path) -> Result<PathBuf> {
        let workdir = self
            .repo
            .workdir()
            .ok_or_else(|| ReleaseError::config("repository has no working directory"))?
            .canonicalize()?;
        let absolute = path.canonicalize()?;
        absolute
            .strip_prefix(&workdir)
            .map(Path::to_path_buf)
            .map_err(|_| {
                ReleaseError::config(format!(
                    "{} is outside the repository at {}",
                    path.display(),
                    workdir.display()
                ))
            })
    }

    fn remote_callbacks(&self) -> Result<git2::RemoteCallbacks<'static>> {
        let config = self.repo.config()?;
        let mut attempts = 0;
        let mut callbacks = git2::RemoteCallbacks::new();

        callbacks.credentials(move |url, username_from_url, allowed_types| {
            attempts += 1;
            if attempts > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::from_str("authentication failed"));
            }

            if allowed_types.contains(git2::CredentialType::USER_PASS_PLAINTEXT) {
                if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                    return git2::Cred::userpass_plaintext("x-access-token", &token);
                }
                if let Ok(cred) = git2::Cred::credential_helper(&config, url, username_from_url)
                {
                    return Ok(cred);
                }
            }

            if allowed_types.contains(git2::CredentialType::SSH_KEY) {
                let username = username_from_url.unwrap_or("git");
                if let Ok(cred) = git2::Cred::ssh_key_from_agent(username) {
                    return Ok(cred);
                }
                if let Some(home) = dirs::home_dir() {
                    for key in ["id_ed25519", "id_rsa", "id_ecdsa"] {
                        let key_path = home.join(".ssh").join(key);
                        if key_path.exists() {
                            if let Ok(cred) = git2::Cred::ssh_key(username, None, &key_path, None)
                            {
                                return Ok(cred);
                            }
                        }
                    }
                }
            }

            git2::Cred::default()
        });

        Ok(callbacks)
    }
}

fn index_entry(path: &Path, id: Oid, mode: u32, size: usize) -> Result<IndexEntry> {
    let path = path
        .to_str()
        .ok_or_else(|| ReleaseError::config(format!("{} is not valid UTF-8", path.display())))?
        .replace('\\', "/")
        .into_bytes();

    Ok(IndexEntry {
        ctime: IndexTime::new(0, 0),
        mtime: IndexTime::new(0, 0),
        dev: 0,
        ino: 0,
        mode,
        uid: 0,
        gid: 0,
        file_size: u32::try_from(size).unwrap_or(u32::MAX),
        id,
        flags: path.len().min(0xfff) as u16,
        flags_extended: 0,
        path,
    })
}

impl super::Repository for Git2Repository {
    fn list_tags(&self) -> Result<Vec<String>> {
        let tags = self.repo.tag_names(None)?;
        let mut names: Vec<String> = tags.iter().flatten().map(|s| s.to_string()).collect();
        names.sort();
        Ok(names)
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        match self.repo.find_reference(&format!("refs/tags/{}", name)) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(false),
            Err(e) if e.code() == ErrorCode::InvalidSpec => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if e.code() == ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if !head.is_branch() {
            return Ok(None);
        }
        Ok(head.shorthand().map(str::to_string))
    }

    fn commit_file(&self, path: &Path, message: &str) -> Result<String> {
        let relative = self.relative_to_workdir(path)?;
        let contents = std::fs::read(path)?;
        let blob = self.repo.blob(&contents)?;

        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == ErrorCode::UnbornBranch => None,
            Err(e) => return Err(e.into()),
        };

        // Built from HEAD's tree so unrelated staged changes stay out of the commit
        let mut tree_index = git2::Index::new()?;
        if let Some(parent) = &parent {
            tree_index.read_tree(&parent.tree()?)?;
        }
        let mode = tree_index
            .get_path(&relative, 0)
            .map(|entry| entry.mode)
            .unwrap_or(BLOB_MODE);
        tree_index.add(&index_entry(&relative, blob, mode, contents.len())?)?;
        let tree = self.repo.find_tree(tree_index.write_tree_to(&self.repo)?)?;

        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let signature = self.signature()?;
        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;

        // Keep the real index in step with the new HEAD for this file only
        let mut index = self.repo.index()?;
        index.add_path(&relative)?;
        index.write()?;

        debug!(commit = %oid, file = %relative.display(), "committed manifest");
        Ok(oid.to_string())
    }

    fn create_annotated_tag(&self, name: &str, message: &str) -> Result<()> {
        if super::Repository::tag_exists(self, name)? {
            return Err(ReleaseError::tag_conflict(name));
        }

        let target = self.repo.head()?.peel(ObjectType::Commit)?;
        let signature = self.signature()?;
        match self.repo.tag(name, &target, &signature, message, false) {
            Ok(oid) => {
                debug!(tag = name, object = %oid, "created annotated tag");
                Ok(())
            }
            Err(e) if e.code() == ErrorCode::Exists => Err(ReleaseError::tag_conflict(name)),
            Err(e) => Err(e.into()),
        }
    }

    fn push_tag(&self, remote: &str, name: &str) -> Result<()> {
        let mut remote = self
            .repo
            .find_remote(remote)
            .map_err(|e| ReleaseError::remote(format!("Cannot find remote '{}': {}", remote, e)))?;

        let mut callbacks = self.remote_callbacks()?;
        callbacks.push_update_reference(|refname, status| match status {
            Some(status) => Err(git2::Error::from_str(&format!(
                "remote rejected {}: {}",
                refname, status
            ))),
            None => Ok(()),
        });

        let mut push_options = git2::PushOptions::new();
        push_options.remote_callbacks(callbacks);

        let refspec = format!("refs/tags/{}:refs/tags/{}", name, name);
        remote
            .push(&[refspec.as_str()], Some(&mut push_options))
            .map_err(|e| ReleaseError::remote(format!("Failed to push tag '{}': {}", name, e)))?;

        debug!(tag = name, "pushed tag");
        Ok(())
    }

    fn fetch_tags(&self, remote: &str) -> Result<()> {
        let mut remote = self
            .repo
            .find_remote(remote)
            .map_err(|e| ReleaseError::remote(format!("Cannot find remote '{}': {}", remote, e)))?;

        let mut fetch_options = git2::FetchOptions::new();
        fetch_options.remote_callbacks(self.remote_callbacks()?);

        remote
            .fetch(&[TAG_REFSPEC], Some(&mut fetch_options), None)
            .map_err(|e| ReleaseError::remote(format!("Fetch failed: {}", e)))?;

        Ok(())
    }
}
