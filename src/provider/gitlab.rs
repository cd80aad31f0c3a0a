//! # GitLab Provider
//!
//! Lists group projects through the GitLab REST API v4.
//!
//! References:
//! - [Group projects](https://docs.gitlab.com/ee/api/groups.html#list-a-groups-projects)
//! - [Branches](https://docs.gitlab.com/ee/api/branches.html)
//! - [Repository tree](https://docs.gitlab.com/ee/api/repositories.html#list-repository-tree)

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::common::{Auth, RestClient};
use super::{CloneProtocol, Repository, RepositoryLister};
use crate::constants::{DEFAULT_GITLAB_API_URL, DEFAULT_PAGE_SIZE};
use crate::error::ProviderError;

/// Pagination header carrying the next page number (empty on the last page)
const NEXT_PAGE_HEADER: &str = "x-next-page";

#[derive(Debug, Deserialize)]
struct GitlabProject {
    id: u64,
    path: String,
    namespace: GitlabNamespace,
    ssh_url_to_repo: Option<String>,
    http_url_to_repo: Option<String>,
    default_branch: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    /// Deprecated alias of `topics` returned by older GitLab versions
    #[serde(default)]
    tag_list: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GitlabNamespace {
    full_path: String,
}

#[derive(Debug, Deserialize)]
struct GitlabBranch {
    name: String,
    commit: GitlabCommit,
}

#[derive(Debug, Deserialize)]
struct GitlabCommit {
    id: String,
}

#[derive(Debug, Deserialize)]
struct GitlabTreeEntry {
    path: String,
}

/// GitLab repository lister
#[derive(Debug)]
pub struct GitlabProvider {
    client: RestClient,
    group: String,
    all_branches: bool,
    include_subgroups: bool,
}

impl GitlabProvider {
    /// Create a client for `group` (numeric id or full path)
    pub fn new(
        group: &str,
        token: String,
        api: Option<&str>,
        all_branches: bool,
        include_subgroups: bool,
    ) -> Result<Self, ProviderError> {
        let api = api.filter(|a| !a.trim().is_empty()).unwrap_or(DEFAULT_GITLAB_API_URL);
        let auth = Auth::token_or_none(token, Auth::PrivateToken);
        Ok(Self {
            client: RestClient::new(api, auth, false)?,
            group: group.to_string(),
            all_branches,
            include_subgroups,
        })
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut full = vec!["api", "v4"];
        full.extend_from_slice(segments);
        self.client.url(&full)
    }

    fn project_id(repo: &Repository) -> Result<&str, ProviderError> {
        repo.repository_id
            .as_deref()
            .ok_or(ProviderError::MissingField("GitLab project id"))
    }

    /// Fetch every page of `url`, following `X-Next-Page`
    async fn paginate<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, ProviderError> {
        let mut items = Vec::new();
        let mut page: Option<String> = None;
        loop {
            let mut page_url = url.clone();
            page_url
                .query_pairs_mut()
                .append_pair("per_page", &DEFAULT_PAGE_SIZE.to_string());
            if let Some(page) = &page {
                page_url.query_pairs_mut().append_pair("page", page);
            }

            let (batch, headers): (Vec<T>, _) = self.client.get_json_with_headers(page_url).await?;
            items.extend(batch);

            page = headers
                .get(NEXT_PAGE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToString::to_string);
            if page.is_none() {
                return Ok(items);
            }
        }
    }
}

/// Parent directory and entry path of `path` as the tree API reports them (no leading `/`)
fn tree_lookup(path: &str) -> (&str, &str) {
    let path = path.trim_matches('/');
    let directory = path.rsplit_once('/').map_or("", |(dir, _)| dir);
    (directory, path)
}

#[async_trait]
impl RepositoryLister for GitlabProvider {
    async fn list_repos(
        &self,
        clone_protocol: CloneProtocol,
    ) -> Result<Vec<Repository>, ProviderError> {
        let mut url = self.api_url(&["groups", &self.group, "projects"])?;
        url.query_pairs_mut()
            .append_pair("include_subgroups", if self.include_subgroups { "true" } else { "false" });

        let projects: Vec<GitlabProject> = self.paginate(url).await?;
        debug!("GitLab returned {} projects", projects.len());

        projects
            .into_iter()
            .map(|project| {
                let url = match clone_protocol {
                    CloneProtocol::Default | CloneProtocol::Ssh => project.ssh_url_to_repo,
                    CloneProtocol::Https => project.http_url_to_repo,
                }
                .ok_or_else(|| clone_protocol.unsupported())?;
                let labels = if project.topics.is_empty() {
                    project.tag_list
                } else {
                    project.topics
                };
                Ok(Repository {
                    organization: project.namespace.full_path,
                    repository: project.path,
                    url,
                    branch: project.default_branch.unwrap_or_default(),
                    sha: String::new(),
                    labels,
                    repository_id: Some(project.id.to_string()),
                })
            })
            .collect()
    }

    async fn repo_has_path(&self, repo: &Repository, path: &str) -> Result<bool, ProviderError> {
        // List the parent directory and look for the entry itself, which
        // works for files and directories alike
        let (directory, path) = tree_lookup(path);
        let mut url = self.api_url(&["projects", Self::project_id(repo)?, "repository", "tree"])?;
        url.query_pairs_mut()
            .append_pair("path", directory)
            .append_pair("ref", &repo.branch);

        match self.paginate::<GitlabTreeEntry>(url).await {
            Ok(entries) => Ok(entries.iter().any(|entry| entry.path == path)),
            Err(ProviderError::Api { status, .. }) if status == reqwest::StatusCode::NOT_FOUND => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn get_branches(&self, repo: &Repository) -> Result<Vec<Repository>, ProviderError> {
        let project_id = Self::project_id(repo)?;

        if !self.all_branches {
            let url = self.api_url(&[
                "projects",
                project_id,
                "repository",
                "branches",
                &repo.branch,
            ])?;
            return Ok(self
                .client
                .get_optional_json::<GitlabBranch>(url)
                .await?
                .map(|b| repo.with_branch(b.name, b.commit.id))
                .into_iter()
                .collect());
        }

        let url = self.api_url(&["projects", project_id, "repository", "branches"])?;
        let branches: Vec<GitlabBranch> = self.paginate(url).await?;
        Ok(branches
            .into_iter()
            .map(|b| repo.with_branch(b.name, b.commit.id))
            .collect())
    }
}
