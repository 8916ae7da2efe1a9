use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::config::Config;

/// Captured result of a finished git command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Trimmed stderr, falling back to stdout when stderr is empty
    pub fn error_text(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// The git commands a mirror run needs.
///
/// `Err` means the command could not be run at all; a command that ran and
/// exited nonzero is `Ok` with `success == false`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GitBackend: Send + Sync {
    /// `git clone <url> <dest>`
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<CommandOutput>;

    /// `git fetch --all --prune`
    async fn fetch_all(&self, repo: &Path) -> Result<CommandOutput>;

    /// `git branch`
    async fn list_branches(&self, repo: &Path) -> Result<CommandOutput>;

    /// `git reset --hard <reference>`
    async fn reset_hard(&self, repo: &Path, reference: &str) -> Result<CommandOutput>;

    /// `git clean -xdf`
    async fn clean_all(&self, repo: &Path) -> Result<CommandOutput>;
}

/// Git operations backed by the `git` executable
#[derive(Debug, Clone)]
pub struct GitClient {
    binary: PathBuf,
}

impl GitClient {
    /// Create a new Git client with the given configuration
    pub fn new(config: &Config) -> Self {
        Self::with_binary(&config.git.binary)
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    async fn run(&self, cwd: Option<&Path>, args: &[&str]) -> Result<CommandOutput> {
        let mut command = AsyncCommand::new(&self.binary);
        command.args(args).env("GIT_TERMINAL_PROMPT", "0");
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }

        debug!("Running git {} in {:?}", args.join(" "), cwd);

        let output = command
            .output()
            .await
            .with_context(|| format!("Failed to execute git {}", args.first().unwrap_or(&"")))?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[async_trait]
impl GitBackend for GitClient {
    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<CommandOutput> {
        let dest = dest.to_string_lossy();
        self.run(None, &["clone", url, dest.as_ref()]).await
    }

    async fn fetch_all(&self, repo: &Path) -> Result<CommandOutput> {
        self.run(Some(repo), &["fetch", "--all", "--prune"]).await
    }

    async fn list_branches(&self, repo: &Path) -> Result<CommandOutput> {
        self.run(Some(repo), &["branch"]).await
    }

    async fn reset_hard(&self, repo: &Path, reference: &str) -> Result<CommandOutput> {
        self.run(Some(repo), &["reset", "--hard", reference]).await
    }

    async fn clean_all(&self, repo: &Path) -> Result<CommandOutput> {
        self.run(Some(repo), &["clean", "-xdf"]).await
    }
}
