use anyhow::{Context, Result};
use octocrab::models::Repository;
use octocrab::Octocrab;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::Config;

/// Kind of GitHub account whose repositories are mirrored
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EntityKind {
    /// Repositories owned by the authenticated user
    User,
    /// All repositories of an organization visible to the token
    Organization,
}

/// Query string for `GET /user/repos`
#[derive(Serialize)]
struct OwnedReposQuery {
    affiliation: &'static str,
    per_page: u8,
    page: u32,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => f.write_str("user"),
            EntityKind::Organization => f.write_str("organization"),
        }
    }
}

/// GitHub client wrapper with authentication management
#[derive(Clone)]
pub struct GitHubClient {
    client: Octocrab,
    username: String,
}

impl GitHubClient {
    /// Authenticate with a personal access token
    pub async fn connect(token: &str, config: &Config) -> Result<Self> {
        let client = Self::build(token, config.github.api_url.as_deref())?;

        // Get authenticated user information
        let user = client
            .current()
            .user()
            .await
            .context("Authentication failed: check that the access token is valid")?;

        info!("Authenticated as GitHub user: {}", user.login);

        Ok(Self {
            client,
            username: user.login,
        })
    }

    fn build(token: &str, api_url: Option<&str>) -> Result<Octocrab> {
        if token.trim().is_empty() {
            anyhow::bail!("Authentication failed: access token is empty");
        }

        let mut builder = Octocrab::builder().personal_token(token.to_string());

        if let Some(api_url) = api_url {
            debug!("Using GitHub API at {}", api_url);
            builder = builder
                .base_uri(api_url)
                .with_context(|| format!("Invalid GitHub API URL: {}", api_url))?;
        }

        builder.build().context("Failed to create GitHub client")
    }

    /// Get the authenticated username
    pub fn username(&self) -> &str {
        &self.username
    }

    /// List repositories for a user or an organization
    pub async fn list_repositories(&self, kind: EntityKind, name: &str) -> Result<Vec<Repository>> {
        match kind {
            EntityKind::User => {
                if !name.eq_ignore_ascii_case(&self.username) {
                    warn!(
                        "Requested user {} differs from the token owner {}; \
                         mirroring repositories owned by {}",
                        name, self.username, self.username
                    );
                }
                self.list_owned_repositories().await
            }
            EntityKind::Organization => self.list_organization_repositories(name).await,
        }
    }

    /// List all repositories owned by the authenticated user
    pub async fn list_owned_repositories(&self) -> Result<Vec<Repository>> {
        debug!("Fetching owned repositories for: {}", self.username);

        let mut repositories = Vec::new();
        let mut page = 1u32;

        // list_repos_for_authenticated_user() takes a u8 page number
        loop {
            let query = OwnedReposQuery {
                affiliation: "owner",
                per_page: 100,
                page,
            };
            let items: Vec<Repository> = self
                .client
                .get("/user/repos", Some(&query))
                .await
                .with_context(|| format!("Failed to fetch repositories page {}", page))?;

            if items.is_empty() {
                break;
            }

            repositories.extend(items);
            page += 1;
        }

        info!("Found {} user repositories", repositories.len());
        Ok(repositories)
    }

    /// List repositories for a specific organization
    pub async fn list_organization_repositories(&self, org: &str) -> Result<Vec<Repository>> {
        debug!("Fetching repositories for organization: {}", org);

        let mut repositories = Vec::new();
        let mut page = 1u32;

        loop {
            let page_repos = self
                .client
                .orgs(org)
                .list_repos()
                .per_page(100)
                .page(page)
                .send()
                .await
                .with_context(|| {
                    format!("Failed to fetch repositories for organization {} page {}", org, page)
                })?;

            let items = page_repos.items;
            if items.is_empty() {
                break;
            }

            repositories.extend(items);
            page += 1;
        }

        info!(
            "Found {} repositories for organization: {}",
            repositories.len(),
            org
        );
        Ok(repositories)
    }
}
