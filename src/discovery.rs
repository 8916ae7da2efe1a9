//! Repository discovery abstraction layer
//!
//! The sync engine only needs a list of names and clone URLs. This module
//! defines that shape ([`RepoSpec`]) and the [`Discovery`] trait that
//! produces it, with a GitHub implementation and a fixed-list one.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::github::{EntityKind, GitHubClient};

/// Provider-agnostic repository descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    /// Repository name, also the directory name under the mirror root
    pub name: String,

    /// Owner login (user or organization)
    pub owner: String,

    /// URL handed to `git clone`
    pub clone_url: String,

    /// Default branch as reported by the hosting service, if known
    pub default_branch: Option<String>,
}

impl RepoSpec {
    pub fn new(
        name: impl Into<String>,
        owner: impl Into<String>,
        clone_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            clone_url: clone_url.into(),
            default_branch: None,
        }
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = Some(branch.into());
        self
    }

    /// Get display name (owner/name format)
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Directory this repository is mirrored to under `root`
    pub fn local_path(&self, root: &Path) -> Result<PathBuf> {
        let name = self.name.as_str();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            bail!("Repository name {:?} is not a valid directory name", name);
        }
        Ok(root.join(name))
    }
}

/// Trait for repository discovery from various providers
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Discover repositories, in the order they should be processed
    async fn discover(&self) -> Result<Vec<RepoSpec>>;

    /// Provider name for display/logging
    fn provider_name(&self) -> &'static str;
}

/// GitHub repository discovery for one user or organization
pub struct GitHubDiscovery {
    client: GitHubClient,
    kind: EntityKind,
    name: String,
}

impl GitHubDiscovery {
    pub fn new(client: GitHubClient, kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            client,
            kind,
            name: name.into(),
        }
    }

    /// Convert octocrab Repository to our RepoSpec
    fn repo_to_spec(&self, repo: &octocrab::models::Repository) -> RepoSpec {
        let owner = repo
            .owner
            .as_ref()
            .map(|o| o.login.clone())
            .unwrap_or_else(|| self.name.clone());

        // Prefer the HTTPS URL, fall back to SSH
        let clone_url = match (&repo.clone_url, &repo.ssh_url) {
            (Some(https), _) => https.to_string(),
            (None, Some(ssh)) => ssh.clone(),
            (None, None) => format!("https://github.com/{}/{}.git", owner, repo.name),
        };

        RepoSpec {
            name: repo.name.clone(),
            owner,
            clone_url,
            default_branch: repo.default_branch.clone(),
        }
    }
}

#[async_trait]
impl Discovery for GitHubDiscovery {
    async fn discover(&self) -> Result<Vec<RepoSpec>> {
        let repositories = self.client.list_repositories(self.kind, &self.name).await?;

        Ok(repositories
            .iter()
            .map(|repo| self.repo_to_spec(repo))
            .collect())
    }

    fn provider_name(&self) -> &'static str {
        "GitHub"
    }
}

/// Discovery over a fixed list
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    repos: Vec<RepoSpec>,
}

impl StaticDiscovery {
    pub fn new(repos: Vec<RepoSpec>) -> Self {
        Self { repos }
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn discover(&self) -> Result<Vec<RepoSpec>> {
        Ok(self.repos.clone())
    }

    fn provider_name(&self) -> &'static str {
        "static"
    }
}
