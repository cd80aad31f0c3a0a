//! # Provider Modules
//!
//! Repository listing for the supported SCM providers.
//!
//! Each provider client implements [`RepositoryLister`]. The Provider
//! Selector ([`selector::ProviderSelector`]) builds the one matching the
//! generator configuration with credentials resolved from Kubernetes Secrets.

use async_trait::async_trait;
use std::fmt;

use crate::crd::ScmProviderFilter;
use crate::error::ProviderError;

/// A repository matched at the provider, pinned to one branch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repository {
    pub organization: String,
    pub repository: String,
    /// Clone URL in the requested protocol
    pub url: String,
    pub branch: String,
    /// Commit SHA at the head of `branch`; empty until branches are expanded
    pub sha: String,
    pub labels: Vec<String>,
    /// Provider-internal identifier (GitLab project id, Azure DevOps repo id)
    pub repository_id: Option<String>,
}

impl Repository {
    /// Copy of this repository pinned to `branch` at `sha`
    pub fn with_branch(&self, branch: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            sha: sha.into(),
            ..self.clone()
        }
    }
}

/// Transport used in the emitted clone URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloneProtocol {
    /// Provider default (SSH where the provider offers it)
    #[default]
    Default,
    Ssh,
    Https,
}

impl CloneProtocol {
    /// Parse the `cloneProtocol` setting; unset or empty means provider default
    pub fn parse(value: Option<&str>) -> Result<Self, ProviderError> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::Default),
            Some("ssh") => Ok(Self::Ssh),
            Some("https") => Ok(Self::Https),
            Some(other) => Err(ProviderError::UnsupportedCloneProtocol {
                protocol: other.to_string(),
            }),
        }
    }

    /// Error for a protocol the provider returned no URL for
    pub(crate) fn unsupported(self) -> ProviderError {
        ProviderError::UnsupportedCloneProtocol {
            protocol: self.to_string(),
        }
    }
}

impl fmt::Display for CloneProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Default => "default",
            Self::Ssh => "ssh",
            Self::Https => "https",
        })
    }
}

/// Repository listing capability of an SCM provider
///
/// Implementors supply the three primitives; [`RepositoryLister::list_repositories`]
/// combines them with the generator filters.
#[async_trait]
pub trait RepositoryLister: Send + Sync {
    /// Repositories of the configured organization, each on its default branch
    async fn list_repos(&self, clone_protocol: CloneProtocol)
        -> Result<Vec<Repository>, ProviderError>;

    /// Whether `path` exists in `repo` at `repo.branch`
    async fn repo_has_path(&self, repo: &Repository, path: &str) -> Result<bool, ProviderError>;

    /// `repo` expanded to one entry per branch in scope, with SHAs filled in
    async fn get_branches(&self, repo: &Repository) -> Result<Vec<Repository>, ProviderError>;

    /// Repositories and branches matching `filters`, with URLs in `clone_protocol`
    async fn list_repositories(
        &self,
        filters: &[ScmProviderFilter],
        clone_protocol: Option<&str>,
    ) -> Result<Vec<Repository>, ProviderError> {
        filter::list_repositories(self, filters, clone_protocol).await
    }
}

pub mod filter;
pub mod selector;

// Common utilities shared across providers
pub(crate) mod common;

// Provider implementations
pub mod azure_devops;
pub mod bitbucket_server;
pub mod gitea;
pub mod github;
pub mod gitlab;
