//! # Azure DevOps Provider
//!
//! Lists the Git repositories of one Azure DevOps team project through the
//! Azure DevOps Services REST API 7.0. The Personal Access Token is sent as
//! the password of HTTP Basic auth with an empty username.
//!
//! References:
//! - [Repositories - List](https://learn.microsoft.com/en-us/rest/api/azure/devops/git/repositories/list)
//! - [Refs - List](https://learn.microsoft.com/en-us/rest/api/azure/devops/git/refs/list)
//! - [Items - Get](https://learn.microsoft.com/en-us/rest/api/azure/devops/git/items/get)

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use super::common::{Auth, RestClient};
use super::{CloneProtocol, Repository, RepositoryLister};
use crate::constants::{AZURE_DEVOPS_API_VERSION, DEFAULT_AZURE_DEVOPS_API_URL};
use crate::error::ProviderError;

const BRANCH_REF_PREFIX: &str = "refs/heads/";
const CONTINUATION_HEADER: &str = "x-ms-continuationtoken";

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureRepo {
    id: String,
    name: String,
    remote_url: Option<String>,
    ssh_url: Option<String>,
    default_branch: Option<String>,
    #[serde(default)]
    is_disabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AzureRef {
    name: String,
    object_id: String,
}

/// Azure DevOps repository lister
#[derive(Debug)]
pub struct AzureDevOpsProvider {
    client: RestClient,
    organization: String,
    team_project: String,
    all_branches: bool,
}

impl AzureDevOpsProvider {
    /// Create a client for `organization`/`team_project`
    ///
    /// An empty or missing `api` means `https://dev.azure.com`.
    pub fn new(
        access_token: String,
        organization: &str,
        api: Option<&str>,
        team_project: &str,
        all_branches: bool,
    ) -> Result<Self, ProviderError> {
        let api = api
            .filter(|a| !a.trim().is_empty())
            .unwrap_or(DEFAULT_AZURE_DEVOPS_API_URL);
        let auth = if access_token.is_empty() {
            Auth::None
        } else {
            Auth::Basic {
                username: String::new(),
                password: access_token,
            }
        };
        Ok(Self {
            client: RestClient::new(api, auth, false)?,
            organization: organization.to_string(),
            team_project: team_project.to_string(),
            all_branches,
        })
    }

    fn git_url(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut full = vec![
            self.organization.as_str(),
            self.team_project.as_str(),
            "_apis",
            "git",
        ];
        full.extend_from_slice(segments);
        let mut url = self.client.url(&full)?;
        url.query_pairs_mut()
            .append_pair("api-version", AZURE_DEVOPS_API_VERSION);
        Ok(url)
    }

    fn repository_id(repo: &Repository) -> Result<&str, ProviderError> {
        repo.repository_id
            .as_deref()
            .ok_or(ProviderError::MissingField("Azure DevOps repository id"))
    }

    /// Branch refs of `repo` whose name starts with `heads/{prefix}`
    async fn branch_refs(&self, repo: &Repository, prefix: &str) -> Result<Vec<AzureRef>, ProviderError> {
        let url = self.git_url(&["repositories", Self::repository_id(repo)?, "refs"])?;
        let filter = format!("heads/{prefix}");

        let mut refs = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let mut page_url = url.clone();
            page_url.query_pairs_mut().append_pair("filter", &filter);
            if let Some(token) = &continuation {
                page_url
                    .query_pairs_mut()
                    .append_pair("continuationToken", token);
            }

            let (page, headers): (ListResponse<AzureRef>, _) =
                self.client.get_json_with_headers(page_url).await?;
            refs.extend(page.value);

            continuation = headers
                .get(CONTINUATION_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(ToString::to_string);
            if continuation.is_none() {
                return Ok(refs);
            }
        }
    }
}

fn short_branch_name(name: &str) -> &str {
    name.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(name)
}

#[async_trait]
impl RepositoryLister for AzureDevOpsProvider {
    async fn list_repos(
        &self,
        clone_protocol: CloneProtocol,
    ) -> Result<Vec<Repository>, ProviderError> {
        let url = self.git_url(&["repositories"])?;
        let listed: ListResponse<AzureRepo> = self.client.get_json(url).await?;
        debug!("Azure DevOps returned {} repositories", listed.value.len());

        let mut repos = Vec::with_capacity(listed.value.len());
        for repo in listed.value {
            if repo.is_disabled {
                warn!("Skipping disabled repository {}", repo.name);
                continue;
            }
            let Some(default_branch) = repo.default_branch else {
                warn!("Skipping repository {} without a default branch", repo.name);
                continue;
            };
            let url = match clone_protocol {
                CloneProtocol::Default | CloneProtocol::Https => repo.remote_url,
                CloneProtocol::Ssh => repo.ssh_url,
            }
            .ok_or_else(|| clone_protocol.unsupported())?;

            repos.push(Repository {
                organization: self.organization.clone(),
                repository: repo.name,
                url,
                branch: short_branch_name(&default_branch).to_string(),
                sha: String::new(),
                labels: Vec::new(),
                repository_id: Some(repo.id),
            });
        }
        Ok(repos)
    }

    async fn repo_has_path(&self, repo: &Repository, path: &str) -> Result<bool, ProviderError> {
        let mut url = self.git_url(&["repositories", Self::repository_id(repo)?, "items"])?;
        url.query_pairs_mut()
            .append_pair("path", path)
            .append_pair("versionDescriptor.version", &repo.branch)
            .append_pair("versionDescriptor.versionType", "branch");
        self.client.exists(url).await
    }

    async fn get_branches(&self, repo: &Repository) -> Result<Vec<Repository>, ProviderError> {
        if !self.all_branches {
            // The ref filter is a prefix match; keep the exact branch only
            let wanted = format!("{BRANCH_REF_PREFIX}{}", repo.branch);
            return Ok(self
                .branch_refs(repo, &repo.branch)
                .await?
                .into_iter()
                .find(|r| r.name == wanted)
                .map(|r| repo.with_branch(short_branch_name(&r.name), r.object_id))
                .into_iter()
                .collect());
        }

        Ok(self
            .branch_refs(repo, "")
            .await?
            .into_iter()
            .map(|r| repo.with_branch(short_branch_name(&r.name), r.object_id))
            .collect())
    }
}
