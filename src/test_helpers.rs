//! Shared test utilities.
//!
//! Builds throwaway sites in temp directories and provides a recording
//! fake for the git collaborator, so resolver and assembler tests never
//! shell out.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let (tmp, site) = test_site();
//! write(tmp.path(), "notes/a.md", "# A");
//! // ... resolve elements against `site` ...
//! assert!(read(&tmp.path().join("web/a/index.html")).contains("<h1>A</h1>"));
//! ```

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

use crate::config::SiteConfig;
use crate::context::Site;
use crate::git::{self, GitError, GitMirror, RepoStats};

// =========================================================================
// Fixture setup
// =========================================================================

/// Config for a site whose output goes to `<tmp>/web`.
pub fn test_config(tmp: &TempDir, url: Option<&str>) -> SiteConfig {
    SiteConfig {
        out: tmp.path().join("web").to_string_lossy().into_owned(),
        url: url.map(str::to_string),
        ..SiteConfig::default()
    }
}

/// A site rooted in a fresh temp directory, without a canonical URL.
///
/// Uses [`FakeGit`]; tests never touch a real repository.
pub fn test_site() -> (TempDir, Site) {
    let (tmp, site, _) = test_site_with_fake_git(None);
    (tmp, site)
}

/// A site with the given canonical URL plus the fake's call log.
pub fn test_site_with_fake_git(url: Option<&str>) -> (TempDir, Site, Rc<RefCell<Vec<String>>>) {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp, url);
    let fake = FakeGit::default();
    let calls = Rc::clone(&fake.calls);
    let site = Site::new(tmp.path(), config)
        .unwrap()
        .with_git(Box::new(fake));
    (tmp, site, calls)
}

/// Write `content` at `root/rel`, creating parent directories.
pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Read a file that must exist.
pub fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

// =========================================================================
// Git fake
// =========================================================================

/// Records calls and creates an empty mirror directory instead of cloning.
#[derive(Default)]
pub struct FakeGit {
    pub calls: Rc<RefCell<Vec<String>>>,
}

impl GitMirror for FakeGit {
    fn ensure_mirror(
        &self,
        source: &Path,
        git_root: &Path,
        branch: &str,
    ) -> Result<PathBuf, GitError> {
        self.calls
            .borrow_mut()
            .push(format!("ensure_mirror {}@{branch}", source.display()));
        let mirror = git::mirror_path(git_root, &source.to_string_lossy());
        fs::create_dir_all(&mirror)?;
        Ok(mirror)
    }

    fn repo_stats(&self, mirror: &Path) -> Result<RepoStats, GitError> {
        self.calls
            .borrow_mut()
            .push(format!("repo_stats {}", mirror.display()));
        Ok(RepoStats {
            commits: 7,
            files: 3,
            size: "12.00 KiB".to_string(),
        })
    }
}
