//! Common test utilities: throwaway git remotes and mirror roots
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Whether a usable `git` binary is on PATH
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Run git in `dir` with a fixed identity, panicking on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Mirror Test")
        .env("GIT_AUTHOR_EMAIL", "mirror@test.invalid")
        .env("GIT_COMMITTER_NAME", "Mirror Test")
        .env("GIT_COMMITTER_EMAIL", "mirror@test.invalid")
        .output()
        .expect("Failed to execute git");

    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );

    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// A bare "remote" plus the working copy used to push commits into it
pub struct RemoteRepo {
    pub name: String,
    pub bare: PathBuf,
    pub work: PathBuf,
    pub branch: String,
}

impl RemoteRepo {
    /// Create `<base>/<name>.git` with one commit on `branch`
    pub fn create(base: &Path, name: &str, branch: &str) -> Self {
        let work = base.join(format!("{}-work", name));
        let bare = base.join(format!("{}.git", name));
        std::fs::create_dir_all(&work).expect("Failed to create work dir");

        git(&work, &["init", "-q"]);
        git(&work, &["symbolic-ref", "HEAD", &format!("refs/heads/{}", branch)]);
        std::fs::write(work.join("README.md"), format!("# {}\n", name)).unwrap();
        git(&work, &["add", "README.md"]);
        git(&work, &["-c", "commit.gpgsign=false", "commit", "-q", "-m", "initial commit"]);

        git(base, &["clone", "-q", "--bare", work.to_str().unwrap(), bare.to_str().unwrap()]);
        git(&work, &["remote", "add", "origin", bare.to_str().unwrap()]);

        Self {
            name: name.to_string(),
            bare,
            work,
            branch: branch.to_string(),
        }
    }

    /// Commit a new file and push it to the bare remote
    pub fn push_commit(&self, file: &str, contents: &str) {
        std::fs::write(self.work.join(file), contents).unwrap();
        git(&self.work, &["add", file]);
        git(&self.work, &["-c", "commit.gpgsign=false", "commit", "-q", "-m", &format!("add {}", file)]);
        git(&self.work, &["push", "-q", "origin", &self.branch]);
    }

    /// Clone URL usable by `git clone`
    pub fn url(&self) -> String {
        format!("file://{}", self.bare.display())
    }

    /// Commit id of the remote branch head
    pub fn head(&self) -> String {
        git(&self.bare, &["rev-parse", &format!("refs/heads/{}", self.branch)])
            .trim()
            .to_string()
    }
}

/// Clone `remote` into `root/<name>` the way a previous run would have
pub fn mirror_existing(root: &Path, remote: &RemoteRepo) -> PathBuf {
    std::fs::create_dir_all(root).unwrap();
    let dest = root.join(&remote.name);
    git(root, &["clone", "-q", &remote.url(), dest.to_str().unwrap()]);
    dest
}

/// Commit id checked out in a local mirror
pub fn local_head(path: &Path) -> String {
    git(path, &["rev-parse", "HEAD"]).trim().to_string()
}

/// Scratch space holding remotes and a mirror root
pub struct TestEnvironment {
    pub temp_dir: TempDir,
    pub remotes: PathBuf,
    pub mirror: PathBuf,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let remotes = temp_dir.path().join("remotes");
        let mirror = temp_dir.path().join("mirror");
        std::fs::create_dir_all(&remotes).expect("Failed to create remotes dir");

        Self {
            temp_dir,
            remotes,
            mirror,
        }
    }
}

/// Assertion helpers for test validation
pub fn assert_contains_all(text: &str, expected: &[&str]) {
    for item in expected {
        assert!(
            text.contains(item),
            "Expected text to contain '{}', but it didn't. Text: {}",
            item,
            text
        );
    }
}

