//! ghmirror - keep a local mirror of every GitHub repository of an account
//!
//! Each run lists the repositories of a user or organization and, for each
//! one, either clones it (with retry and backoff) or fetches and hard-resets
//! the existing copy to `origin/main` or `origin/master`, then removes
//! untracked files. A summary with counts, name lists and the mirror's
//! on-disk size is produced at the end.
//!
//! ## Modules
//!
//! - [`config`]: YAML configuration and retry policy
//! - [`github`]: GitHub API access via octocrab
//! - [`discovery`]: provider-agnostic repository listing
//! - [`git`]: the git command backend
//! - [`branch`]: `main`/`master` detection
//! - [`sync`]: per-repository synchronization and the batch engine
//! - [`summary`]: batch results and the final report
//! - [`size`]: on-disk size accounting

pub mod branch;
pub mod config;
pub mod discovery;
pub mod git;
pub mod github;
pub mod size;
pub mod summary;
pub mod sync;

pub use config::Config;
pub use discovery::{Discovery, GitHubDiscovery, RepoSpec, StaticDiscovery};
pub use git::{CommandOutput, GitBackend, GitClient};
pub use github::{EntityKind, GitHubClient};
pub use summary::BatchSummary;
pub use sync::{RepoOutcome, RepoSynchronizer, SyncEngine};
