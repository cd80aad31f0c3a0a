//! # Bitbucket Server Provider
//!
//! Lists project repositories through the Bitbucket Server (Data Center)
//! REST API 1.0. Responses are paged with `start`/`limit` and carry
//! `isLastPage`/`nextPageStart`.

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use super::common::{path_segments, Auth, RestClient};
use super::{CloneProtocol, Repository, RepositoryLister};
use crate::constants::DEFAULT_PAGE_SIZE;
use crate::error::ProviderError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    values: Vec<T>,
    #[serde(default = "default_last_page")]
    is_last_page: bool,
    next_page_start: Option<u64>,
}

fn default_last_page() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct BitbucketRepo {
    slug: String,
    project: BitbucketProject,
    #[serde(default)]
    links: BitbucketLinks,
}

#[derive(Debug, Deserialize)]
struct BitbucketProject {
    key: String,
}

#[derive(Debug, Default, Deserialize)]
struct BitbucketLinks {
    #[serde(default)]
    clone: Vec<BitbucketLink>,
}

#[derive(Debug, Deserialize)]
struct BitbucketLink {
    href: String,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BitbucketBranch {
    display_id: String,
    latest_commit: String,
}

/// Bitbucket Server repository lister
#[derive(Debug)]
pub struct BitbucketServerProvider {
    client: RestClient,
    project: String,
    all_branches: bool,
}

impl BitbucketServerProvider {
    /// Client using HTTP Basic credentials
    pub fn new_basic_auth(
        project: &str,
        api: &str,
        username: String,
        password: String,
        all_branches: bool,
    ) -> Result<Self, ProviderError> {
        Self::build(project, api, Auth::Basic { username, password }, all_branches)
    }

    /// Anonymous client
    pub fn new_no_auth(project: &str, api: &str, all_branches: bool) -> Result<Self, ProviderError> {
        Self::build(project, api, Auth::None, all_branches)
    }

    fn build(project: &str, api: &str, auth: Auth, all_branches: bool) -> Result<Self, ProviderError> {
        if api.trim().is_empty() {
            return Err(ProviderError::invalid_url(api, "an API URL is required"));
        }
        Ok(Self {
            client: RestClient::new(api, auth, false)?,
            project: project.to_string(),
            all_branches,
        })
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut full = vec!["rest", "api", "1.0"];
        full.extend_from_slice(segments);
        self.client.url(&full)
    }

    fn repo_url(&self, repo: &Repository, tail: &[&str]) -> Result<Url, ProviderError> {
        let mut segments = vec![
            "projects",
            repo.organization.as_str(),
            "repos",
            repo.repository.as_str(),
        ];
        segments.extend_from_slice(tail);
        self.api_url(&segments)
    }

    async fn paginate<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, ProviderError> {
        let limit = DEFAULT_PAGE_SIZE.to_string();
        let mut items = Vec::new();
        let mut start = 0;
        loop {
            let mut page_url = url.clone();
            page_url
                .query_pairs_mut()
                .append_pair("start", &start.to_string())
                .append_pair("limit", &limit);
            let page: Page<T> = self.client.get_json(page_url).await?;
            items.extend(page.values);
            match page.next_page_start {
                Some(next) if !page.is_last_page => start = next,
                _ => return Ok(items),
            }
        }
    }

    /// Default branch of `repo`, `None` for repositories without commits
    async fn default_branch(&self, repo: &Repository) -> Result<Option<BitbucketBranch>, ProviderError> {
        let url = self.repo_url(repo, &["branches", "default"])?;
        self.client.get_optional_json(url).await
    }
}

#[async_trait]
impl RepositoryLister for BitbucketServerProvider {
    async fn list_repos(
        &self,
        clone_protocol: CloneProtocol,
    ) -> Result<Vec<Repository>, ProviderError> {
        let url = self.api_url(&["projects", &self.project, "repos"])?;
        let listed: Vec<BitbucketRepo> = self.paginate(url).await?;
        debug!("Bitbucket Server returned {} repositories", listed.len());

        let link_name = match clone_protocol {
            CloneProtocol::Default | CloneProtocol::Ssh => "ssh",
            CloneProtocol::Https => "http",
        };

        let mut repos = Vec::with_capacity(listed.len());
        for listed_repo in listed {
            let url = listed_repo
                .links
                .clone
                .into_iter()
                .find(|link| link.name == link_name)
                .map(|link| link.href)
                .ok_or_else(|| clone_protocol.unsupported())?;

            let mut repo = Repository {
                organization: listed_repo.project.key,
                repository: listed_repo.slug,
                url,
                ..Default::default()
            };
            match self.default_branch(&repo).await? {
                Some(branch) => {
                    repo.branch = branch.display_id;
                    repo.sha = branch.latest_commit;
                }
                None => {
                    warn!(
                        "Skipping {}/{}: no default branch",
                        repo.organization, repo.repository
                    );
                    continue;
                }
            }
            repos.push(repo);
        }
        Ok(repos)
    }

    async fn repo_has_path(&self, repo: &Repository, path: &str) -> Result<bool, ProviderError> {
        let mut tail = vec!["browse"];
        tail.extend(path_segments(path));
        let mut url = self.repo_url(repo, &tail)?;
        url.query_pairs_mut()
            .append_pair("at", &repo.branch)
            .append_pair("type", "true");
        self.client.exists(url).await
    }

    async fn get_branches(&self, repo: &Repository) -> Result<Vec<Repository>, ProviderError> {
        // Listing already resolved the default branch head
        if !self.all_branches {
            return Ok(vec![repo.clone()]);
        }

        let url = self.repo_url(repo, &["branches"])?;
        let branches: Vec<BitbucketBranch> = self.paginate(url).await?;
        Ok(branches
            .into_iter()
            .map(|b| repo.with_branch(b.display_id, b.latest_commit))
            .collect())
    }
}
