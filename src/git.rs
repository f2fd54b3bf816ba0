//! Git repository mirroring.
//!
//! A `gt <path>` directive publishes a repository alongside the site:
//!
//! ```text
//! <out>/_git/<name>.git     bare mirror, served over dumb HTTP
//! <src>/.git/hooks/post-commit   pushes every commit to the mirror
//! ```
//!
//! The pipeline only sees the [`GitMirror`] trait. [`SubprocessGit`] drives
//! the `git` binary; every call blocks, and any failure after the clone has
//! started is fatal (no cleanup of a half-created mirror).

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GitError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("`git {args}` failed in {dir}: {stderr}")]
    Command {
        args: String,
        dir: PathBuf,
        stderr: String,
    },
    #[error("unexpected output from `git {args}`: {output:?}")]
    Output { args: String, output: String },
}

/// Read-only numbers shown on a repository page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoStats {
    pub commits: u64,
    pub files: usize,
    /// Human-readable on-disk size as reported by git, e.g. `12.00 KiB`.
    pub size: String,
}

impl fmt::Display for RepoStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} commits, {} files, {}",
            self.commits, self.files, self.size
        )
    }
}

/// The git operations the site build depends on.
pub trait GitMirror {
    /// Make sure a bare mirror of `source` exists under `git_root`.
    ///
    /// Idempotent: an existing mirror directory is left untouched. Returns
    /// the absolute mirror path.
    fn ensure_mirror(&self, source: &Path, git_root: &Path, branch: &str)
    -> Result<PathBuf, GitError>;

    /// Commit count, tracked file count and size of a mirror.
    fn repo_stats(&self, mirror: &Path) -> Result<RepoStats, GitError>;
}

/// Repository name: the last component of its path.
pub fn repo_name(source: &str) -> String {
    Path::new(source.trim_end_matches('/'))
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.to_string())
}

/// Where the mirror of `source` lives.
pub fn mirror_path(git_root: &Path, source: &str) -> PathBuf {
    git_root.join(format!("{}.git", repo_name(source)))
}

/// Script installed as the source repository's post-commit hook.
pub fn post_commit_hook(remote: &str, branch: &str) -> String {
    format!("#!/bin/sh\ngit push {remote} {branch}\n")
}

/// Mirror management through the `git` executable.
#[derive(Debug, Clone)]
pub struct SubprocessGit {
    remote: String,
}

impl SubprocessGit {
    pub fn new(remote: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
        }
    }

    fn run(&self, dir: Option<&Path>, args: &[&str]) -> Result<String, GitError> {
        let mut cmd = Command::new("git");
        cmd.args(args);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(GitError::Command {
                args: args.join(" "),
                dir: dir.map(Path::to_path_buf).unwrap_or_default(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl GitMirror for SubprocessGit {
    fn ensure_mirror(
        &self,
        source: &Path,
        git_root: &Path,
        branch: &str,
    ) -> Result<PathBuf, GitError> {
        fs::create_dir_all(git_root)?;
        let mirror = std::path::absolute(mirror_path(git_root, &source.to_string_lossy()))?;
        if mirror.exists() {
            log::debug!("git mirror already present at {}", mirror.display());
            return Ok(mirror);
        }

        let mirror_arg = mirror.to_string_lossy();
        self.run(
            None,
            &["clone", "--bare", &source.to_string_lossy(), &mirror_arg],
        )?;
        log::debug!("cloned {} into {}", source.display(), mirror.display());

        let update_hook = mirror.join("hooks").join("post-update");
        fs::rename(update_hook.with_extension("sample"), &update_hook)?;
        log::debug!("post-update hook enabled");

        self.run(Some(&mirror), &["update-server-info"])?;
        log::debug!("update-server-info done");

        // A remote left over from an earlier mirror is not an error.
        match self.run(Some(source), &["remote", "add", &self.remote, &mirror_arg]) {
            Ok(_) => log::debug!("remote {} added", self.remote),
            Err(e) => log::warn!("could not add remote {}: {e}", self.remote),
        }

        let hook = source.join(".git").join("hooks").join("post-commit");
        fs::write(&hook, post_commit_hook(&self.remote, branch))?;
        make_executable(&hook)?;
        log::debug!("post-commit hook written to {}", hook.display());

        Ok(mirror)
    }

    fn repo_stats(&self, mirror: &Path) -> Result<RepoStats, GitError> {
        let commits_out = self.run(Some(mirror), &["rev-list", "--count", "HEAD"])?;
        let commits = commits_out
            .trim()
            .parse()
            .map_err(|_| GitError::Output {
                args: "rev-list --count HEAD".into(),
                output: commits_out.clone(),
            })?;

        let objects_out = self.run(Some(mirror), &["count-objects", "-H"])?;
        let size = parse_count_objects_size(&objects_out).ok_or_else(|| GitError::Output {
            args: "count-objects -H".into(),
            output: objects_out.clone(),
        })?;

        let tree_out = self.run(Some(mirror), &["ls-tree", "--full-tree", "-r", "HEAD"])?;
        let files = tree_out.lines().count();

        Ok(RepoStats {
            commits,
            files,
            size,
        })
    }
}

/// Size part of `git count-objects -H` output (`"4 objects, 12.00 KiB"`).
pub fn parse_count_objects_size(output: &str) -> Option<String> {
    output
        .split_once(',')
        .map(|(_, size)| size.trim().to_string())
        .filter(|size| !size.is_empty())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}
