//! # Gitea Provider
//!
//! Lists organization repositories through the Gitea REST API v1.
//! Gitea paginates with `page`/`limit` and advertises the next page in a
//! `Link` header. Servers whose `MAX_RESPONSE_ITEMS` is below the requested
//! limit return short pages that are not the last one, so the header wins;
//! without it a page shorter than the limit ends the listing.

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use super::common::{next_link, path_segments, Auth, RestClient};
use super::{CloneProtocol, Repository, RepositoryLister};
use crate::constants::GITEA_PAGE_SIZE;
use crate::error::ProviderError;

#[derive(Debug, Deserialize)]
struct GiteaRepo {
    name: String,
    clone_url: Option<String>,
    ssh_url: Option<String>,
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GiteaTopics {
    #[serde(default)]
    topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GiteaBranch {
    name: String,
    commit: GiteaCommit,
}

#[derive(Debug, Deserialize)]
struct GiteaCommit {
    id: String,
}

/// Gitea repository lister
#[derive(Debug)]
pub struct GiteaProvider {
    client: RestClient,
    owner: String,
    all_branches: bool,
}

impl GiteaProvider {
    /// Create a client for `owner` on the Gitea instance at `api`
    ///
    /// `insecure` skips TLS certificate verification.
    pub fn new(
        owner: &str,
        token: String,
        api: &str,
        insecure: bool,
        all_branches: bool,
    ) -> Result<Self, ProviderError> {
        if api.trim().is_empty() {
            return Err(ProviderError::invalid_url(api, "an API URL is required"));
        }
        let auth = Auth::token_or_none(token, Auth::Token);
        Ok(Self {
            client: RestClient::new(api, auth, insecure)?,
            owner: owner.to_string(),
            all_branches,
        })
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut full = vec!["api", "v1"];
        full.extend_from_slice(segments);
        self.client.url(&full)
    }

    fn page_url(url: &Url, page: u32) -> Url {
        let mut page_url = url.clone();
        page_url
            .query_pairs_mut()
            .append_pair("limit", &GITEA_PAGE_SIZE.to_string())
            .append_pair("page", &page.to_string());
        page_url
    }

    async fn paginate<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, ProviderError> {
        let mut items = Vec::new();
        let mut page = 1;
        let mut next = Some(Self::page_url(&url, page));
        while let Some(current) = next.take() {
            let (batch, headers): (Vec<T>, _) =
                self.client.get_json_with_headers(current.clone()).await?;
            let short = batch.len() < GITEA_PAGE_SIZE as usize;
            items.extend(batch);

            next = match next_link(&headers, &current) {
                Some(link) => Some(link),
                None if short => None,
                None => {
                    page += 1;
                    Some(Self::page_url(&url, page))
                }
            };
        }
        Ok(items)
    }
}

#[async_trait]
impl RepositoryLister for GiteaProvider {
    async fn list_repos(
        &self,
        clone_protocol: CloneProtocol,
    ) -> Result<Vec<Repository>, ProviderError> {
        let url = self.api_url(&["orgs", &self.owner, "repos"])?;
        let listed: Vec<GiteaRepo> = self.paginate(url).await?;
        debug!("Gitea returned {} repositories", listed.len());

        let mut repos = Vec::with_capacity(listed.len());
        for repo in listed {
            let url = match clone_protocol {
                CloneProtocol::Default | CloneProtocol::Ssh => repo.ssh_url,
                CloneProtocol::Https => repo.clone_url,
            }
            .ok_or_else(|| clone_protocol.unsupported())?;

            let topics_url = self.api_url(&["repos", &self.owner, &repo.name, "topics"])?;
            let topics: GiteaTopics = self.client.get_json(topics_url).await?;

            repos.push(Repository {
                organization: self.owner.clone(),
                repository: repo.name,
                url,
                branch: repo.default_branch.unwrap_or_default(),
                sha: String::new(),
                labels: topics.topics,
                repository_id: None,
            });
        }
        Ok(repos)
    }

    async fn repo_has_path(&self, repo: &Repository, path: &str) -> Result<bool, ProviderError> {
        let mut segments = vec!["repos", repo.organization.as_str(), repo.repository.as_str(), "contents"];
        segments.extend(path_segments(path));
        let mut url = self.api_url(&segments)?;
        url.query_pairs_mut().append_pair("ref", &repo.branch);
        self.client.exists(url).await
    }

    async fn get_branches(&self, repo: &Repository) -> Result<Vec<Repository>, ProviderError> {
        if !self.all_branches {
            let url = self.api_url(&[
                "repos",
                &repo.organization,
                &repo.repository,
                "branches",
                &repo.branch,
            ])?;
            return Ok(self
                .client
                .get_optional_json::<GiteaBranch>(url)
                .await?
                .map(|b| repo.with_branch(b.name, b.commit.id))
                .into_iter()
                .collect());
        }

        let url = self.api_url(&["repos", &repo.organization, &repo.repository, "branches"])?;
        let branches: Vec<GiteaBranch> = self.paginate(url).await?;
        Ok(branches
            .into_iter()
            .map(|b| repo.with_branch(b.name, b.commit.id))
            .collect())
    }
}
