//! # GitHub Provider
//!
//! Lists organization repositories through the GitHub REST API v3
//! (github.com or GitHub Enterprise via `api`).
//!
//! References:
//! - [Repositories](https://docs.github.com/en/rest/repos/repos#list-organization-repositories)
//! - [Branches](https://docs.github.com/en/rest/branches/branches)

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::common::{next_link, path_segments, Auth, RestClient};
use super::{CloneProtocol, Repository, RepositoryLister};
use crate::constants::{DEFAULT_GITHUB_API_URL, DEFAULT_PAGE_SIZE};
use crate::error::ProviderError;

#[derive(Debug, Deserialize)]
struct GithubRepo {
    name: String,
    clone_url: Option<String>,
    ssh_url: Option<String>,
    default_branch: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GithubBranch {
    name: String,
    commit: GithubCommit,
}

#[derive(Debug, Deserialize)]
struct GithubCommit {
    sha: String,
}

/// GitHub repository lister
#[derive(Debug)]
pub struct GithubProvider {
    client: RestClient,
    organization: String,
    all_branches: bool,
}

impl GithubProvider {
    /// Create a client for `organization`
    /// An empty `token` means anonymous access; an empty or missing `api` means github.com.
    pub fn new(
        organization: &str,
        token: String,
        api: Option<&str>,
        all_branches: bool,
    ) -> Result<Self, ProviderError> {
        let api = api.filter(|a| !a.trim().is_empty()).unwrap_or(DEFAULT_GITHUB_API_URL);
        let auth = Auth::token_or_none(token, Auth::Bearer);
        Ok(Self {
            client: RestClient::new(api, auth, false)?,
            organization: organization.to_string(),
            all_branches,
        })
    }

    fn paged(&self, segments: &[&str]) -> Result<reqwest::Url, ProviderError> {
        let mut url = self.client.url(segments)?;
        url.query_pairs_mut()
            .append_pair("per_page", &DEFAULT_PAGE_SIZE.to_string());
        Ok(url)
    }
}

#[async_trait]
impl RepositoryLister for GithubProvider {
    async fn list_repos(
        &self,
        clone_protocol: CloneProtocol,
    ) -> Result<Vec<Repository>, ProviderError> {
        let mut repos = Vec::new();
        let mut next = Some(self.paged(&["orgs", &self.organization, "repos"])?);

        while let Some(url) = next.take() {
            let (page, headers): (Vec<GithubRepo>, _) =
                self.client.get_json_with_headers(url.clone()).await?;
            debug!("GitHub returned {} repositories", page.len());

            for repo in page {
                let url = match clone_protocol {
                    CloneProtocol::Default | CloneProtocol::Ssh => repo.ssh_url,
                    CloneProtocol::Https => repo.clone_url,
                }
                .ok_or_else(|| clone_protocol.unsupported())?;

                repos.push(Repository {
                    organization: self.organization.clone(),
                    repository: repo.name,
                    url,
                    branch: repo.default_branch.unwrap_or_default(),
                    sha: String::new(),
                    labels: repo.topics,
                    repository_id: None,
                });
            }
            next = next_link(&headers, &url);
        }

        Ok(repos)
    }

    async fn repo_has_path(&self, repo: &Repository, path: &str) -> Result<bool, ProviderError> {
        let mut segments = vec!["repos", repo.organization.as_str(), repo.repository.as_str(), "contents"];
        segments.extend(path_segments(path));
        let mut url = self.client.url(&segments)?;
        url.query_pairs_mut().append_pair("ref", &repo.branch);
        self.client.exists(url).await
    }

    async fn get_branches(&self, repo: &Repository) -> Result<Vec<Repository>, ProviderError> {
        if !self.all_branches {
            let url = self.client.url(&[
                "repos",
                &repo.organization,
                &repo.repository,
                "branches",
                &repo.branch,
            ])?;
            // Empty repositories have no default branch to resolve
            return Ok(self
                .client
                .get_optional_json::<GithubBranch>(url)
                .await?
                .map(|b| repo.with_branch(b.name, b.commit.sha))
                .into_iter()
                .collect());
        }

        let mut branches = Vec::new();
        let mut next = Some(self.paged(&["repos", &repo.organization, &repo.repository, "branches"])?);
        while let Some(url) = next.take() {
            let (page, headers): (Vec<GithubBranch>, _) =
                self.client.get_json_with_headers(url.clone()).await?;
            branches.extend(
                page.into_iter()
                    .map(|b| repo.with_branch(b.name, b.commit.sha)),
            );
            next = next_link(&headers, &url);
        }
        Ok(branches)
    }
}
