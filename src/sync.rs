//! Sync Engine - mirrors a list of repositories one at a time
//!
//! [`RepoSynchronizer`] handles a single repository: clone with retry when
//! the local copy is missing, otherwise fetch, hard-reset to the default
//! branch and clean. [`SyncEngine`] runs it over everything a
//! [`Discovery`] source returns and folds the outcomes into a
//! [`BatchSummary`].

use crate::branch::detect_default_branch;
use crate::config::{Config, RetryPolicy};
use crate::discovery::{Discovery, RepoSpec};
use crate::git::{CommandOutput, GitBackend, GitClient};
use crate::size::directory_size;
use crate::summary::BatchSummary;
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Result of mirroring one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOutcome {
    /// Repository was cloned, after this many attempts
    Cloned { attempts: u32 },
    /// Existing copy was reset and fetch reported new data
    Updated,
    /// Existing copy was reset and fetch reported nothing
    Unchanged,
    /// Repository could not be mirrored
    Failed { reason: String },
}

impl RepoOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, RepoOutcome::Failed { .. })
    }
}

impl fmt::Display for RepoOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoOutcome::Cloned { attempts: 1 } => write!(f, "cloned"),
            RepoOutcome::Cloned { attempts } => write!(f, "cloned after {} attempts", attempts),
            RepoOutcome::Updated => write!(f, "updated (changes fetched)"),
            RepoOutcome::Unchanged => write!(f, "up to date (no changes)"),
            RepoOutcome::Failed { reason } => write!(f, "FAILED: {}", reason),
        }
    }
}

/// Whether `git fetch --all` output reports anything beyond its per-remote banner.
///
/// Some git versions print `Fetching <remote>` for every remote even when
/// nothing was transferred.
pub fn fetch_reported_changes(fetch: &CommandOutput) -> bool {
    fetch
        .stdout
        .lines()
        .chain(fetch.stderr.lines())
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with("Fetching "))
}

/// Turn a finished step into its output, or a failure reason
fn check_step(step: &str, result: Result<CommandOutput>) -> std::result::Result<CommandOutput, String> {
    match result {
        Ok(output) if output.success => Ok(output),
        Ok(output) => {
            let detail = output.error_text();
            if detail.is_empty() {
                Err(format!("{} failed", step))
            } else {
                Err(format!("{} failed: {}", step, detail))
            }
        }
        Err(e) => Err(format!("{} could not be run: {:#}", step, e)),
    }
}

/// Mirrors a single repository
#[derive(Clone)]
pub struct RepoSynchronizer {
    git: Arc<dyn GitBackend>,
    retry: RetryPolicy,
    interrupted: Arc<AtomicBool>,
}

impl RepoSynchronizer {
    pub fn new(git: Arc<dyn GitBackend>, retry: RetryPolicy) -> Self {
        Self {
            git,
            retry,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop retrying clones once `flag` is set
    pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    fn interrupted_clone(&self, attempts: u32, last_error: &str) -> RepoOutcome {
        warn!("Interrupted, giving up on clone after {} attempt(s)", attempts);
        let reason = if last_error.is_empty() {
            "clone interrupted".to_string()
        } else {
            format!("clone interrupted after {} attempts: {}", attempts, last_error)
        };
        RepoOutcome::Failed { reason }
    }

    /// Bring `root/<repo.name>` in line with the remote
    pub async fn sync_repository(&self, repo: &RepoSpec, root: &Path) -> RepoOutcome {
        let path = match repo.local_path(root) {
            Ok(path) => path,
            Err(e) => {
                return RepoOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        if path.exists() {
            match self.update_existing(repo, &path).await {
                Ok(outcome) => outcome,
                Err(reason) => RepoOutcome::Failed { reason },
            }
        } else {
            self.clone_with_retry(repo, &path).await
        }
    }

    async fn clone_with_retry(&self, repo: &RepoSpec, path: &Path) -> RepoOutcome {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if self.is_interrupted() {
                return self.interrupted_clone(attempt - 1, &last_error);
            }

            if !self.retry.pre_clone_delay.is_zero() {
                tokio::time::sleep(self.retry.pre_clone_delay).await;
            }

            debug!(
                "Cloning {} -> {} (attempt {}/{})",
                repo.clone_url,
                path.display(),
                attempt,
                max_attempts
            );

            match check_step("git clone", self.git.clone_repo(&repo.clone_url, path).await) {
                Ok(_) => {
                    info!("Cloned {} in {} attempt(s)", repo.full_name(), attempt);
                    return RepoOutcome::Cloned { attempts: attempt };
                }
                Err(reason) => last_error = reason,
            }

            warn!(
                "Clone attempt {}/{} for {} failed: {}",
                attempt,
                max_attempts,
                repo.full_name(),
                last_error
            );

            // A failed clone can leave a partial directory that blocks the next try
            if path.exists() {
                if let Err(e) = tokio::fs::remove_dir_all(path).await {
                    warn!("Failed to remove partial clone {}: {}", path.display(), e);
                }
            }

            if attempt < max_attempts {
                if self.is_interrupted() {
                    return self.interrupted_clone(attempt, &last_error);
                }

                let wait = self.retry.backoff_after(attempt);
                if !wait.is_zero() {
                    debug!("Waiting {:?} before retrying {}", wait, repo.name);
                    tokio::time::sleep(wait).await;
                }
            }
        }

        RepoOutcome::Failed {
            reason: format!("clone failed after {} attempts: {}", max_attempts, last_error),
        }
    }

    async fn update_existing(
        &self,
        repo: &RepoSpec,
        path: &Path,
    ) -> std::result::Result<RepoOutcome, String> {
        let fetch = check_step("git fetch --all --prune", self.git.fetch_all(path).await)?;

        let listing = check_step("git branch", self.git.list_branches(path).await)?;
        let detection = detect_default_branch(&listing.stdout);
        let branch = match detection.branch() {
            Some(branch) => branch,
            None => {
                return Err(detection
                    .failure_reason()
                    .unwrap_or("default branch could not be determined")
                    .to_string())
            }
        };

        if let Some(reported) = repo.default_branch.as_deref() {
            if reported != branch.as_str() {
                warn!(
                    "{}: GitHub reports default branch '{}', local checkout is '{}'",
                    repo.full_name(),
                    reported,
                    branch
                );
            }
        }

        let reference = branch.remote_ref();
        check_step(
            &format!("git reset --hard {}", reference),
            self.git.reset_hard(path, &reference).await,
        )?;
        check_step("git clean -xdf", self.git.clean_all(path).await)?;

        if fetch_reported_changes(&fetch) {
            Ok(RepoOutcome::Updated)
        } else {
            Ok(RepoOutcome::Unchanged)
        }
    }
}

/// The main sync engine that mirrors a whole account
#[derive(Clone)]
pub struct SyncEngine {
    synchronizer: RepoSynchronizer,
    interrupted: Arc<AtomicBool>,
    show_progress: bool,
}

impl SyncEngine {
    /// Create a sync engine that runs the configured git binary
    pub fn new(config: &Config) -> Result<Self> {
        let retry = config.retry_policy()?;
        Ok(Self::with_backend(Arc::new(GitClient::new(config)), retry))
    }

    pub fn with_backend(git: Arc<dyn GitBackend>, retry: RetryPolicy) -> Self {
        let interrupted = Arc::new(AtomicBool::new(false));
        Self {
            synchronizer: RepoSynchronizer::new(git, retry)
                .with_interrupt_flag(interrupted.clone()),
            interrupted,
            show_progress: true,
        }
    }

    /// Print per-repository progress lines to stdout
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Flag checked between repositories; set it to stop the batch early
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Discover repositories and mirror them all under `root`
    pub async fn run(&self, discovery: &dyn Discovery, root: &Path) -> Result<BatchSummary> {
        info!("Discovering repositories from {}", discovery.provider_name());

        let repositories = discovery
            .discover()
            .await
            .context("Failed to discover repositories")?;

        info!("Discovered {} repositories", repositories.len());

        tokio::fs::create_dir_all(root)
            .await
            .with_context(|| format!("Failed to create mirror directory {}", root.display()))?;

        self.sync_all(&repositories, root).await
    }

    /// Mirror the given repositories in order
    pub async fn sync_all(&self, repositories: &[RepoSpec], root: &Path) -> Result<BatchSummary> {
        let start_time = Instant::now();
        let count = repositories.len();
        let mut summary = BatchSummary::default();

        for (index, repo) in repositories.iter().enumerate() {
            if self.interrupted.load(Ordering::SeqCst) {
                warn!("Interrupted, skipping the remaining {} repositories", count - index);
                summary.mark_interrupted(count - index);
                break;
            }

            let action = match repo.local_path(root) {
                Ok(path) if path.exists() => "Updating",
                _ => "Cloning",
            };
            if self.show_progress {
                println!("[{}/{}] {} <{}>", index + 1, count, action, repo.name);
            }

            let outcome = self.synchronizer.sync_repository(repo, root).await;

            if outcome.is_failure() {
                warn!("{}: {}", repo.full_name(), outcome);
            }
            if self.show_progress {
                println!("      {}", outcome);
            }

            summary.record(&repo.name, &outcome);
        }

        // Ctrl-C during the last repository
        if !summary.interrupted && self.interrupted.load(Ordering::SeqCst) {
            summary.mark_interrupted(0);
        }

        summary.size_bytes = Self::measure(root.to_path_buf()).await?;
        summary.duration = start_time.elapsed();

        info!(
            "Mirror run finished in {:.2}s: {} cloned, {} updated, {} unchanged, {} failed",
            summary.duration.as_secs_f64(),
            summary.cloned,
            summary.updated,
            summary.unchanged,
            summary.failed
        );

        Ok(summary)
    }

    async fn measure(root: PathBuf) -> Result<u64> {
        tokio::task::spawn_blocking(move || directory_size(&root))
            .await
            .context("Directory size computation panicked")
    }
}
