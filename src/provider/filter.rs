//! # Repository Filters
//!
//! Applies the generator's `filters` on top of a [`RepositoryLister`].
//!
//! Filters are OR'd together; the conditions inside one filter are AND'd.
//! A filter that only inspects repository-level data (`repositoryMatch`,
//! `labelMatch`) runs before branches are expanded, so excluded repositories
//! never cost a branch listing. A filter touching `branchMatch`,
//! `pathsExist` or `pathsDoNotExist` runs on every expanded branch.

use regex::Regex;
use tracing::debug;

use super::{CloneProtocol, Repository, RepositoryLister};
use crate::crd::ScmProviderFilter;
use crate::error::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterType {
    Repo,
    Branch,
}

#[derive(Debug)]
struct CompiledFilter<'a> {
    repository_match: Option<Regex>,
    label_match: Option<Regex>,
    branch_match: Option<Regex>,
    paths_exist: &'a [String],
    paths_do_not_exist: &'a [String],
    /// `None` for a filter with no conditions; such filters are ignored
    filter_type: Option<FilterType>,
}

fn compile_pattern(pattern: Option<&str>) -> Result<Option<Regex>, ProviderError> {
    pattern
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| ProviderError::InvalidFilter {
                pattern: pattern.to_string(),
                source,
            })
        })
        .transpose()
}

impl<'a> CompiledFilter<'a> {
    fn compile(filter: &'a ScmProviderFilter) -> Result<Self, ProviderError> {
        let repository_match = compile_pattern(filter.repository_match.as_deref())?;
        let label_match = compile_pattern(filter.label_match.as_deref())?;
        let branch_match = compile_pattern(filter.branch_match.as_deref())?;

        let filter_type = if branch_match.is_some()
            || !filter.paths_exist.is_empty()
            || !filter.paths_do_not_exist.is_empty()
        {
            Some(FilterType::Branch)
        } else if repository_match.is_some() || label_match.is_some() {
            Some(FilterType::Repo)
        } else {
            None
        };

        Ok(Self {
            repository_match,
            label_match,
            branch_match,
            paths_exist: &filter.paths_exist,
            paths_do_not_exist: &filter.paths_do_not_exist,
            filter_type,
        })
    }

    async fn matches<L: RepositoryLister + ?Sized>(
        &self,
        lister: &L,
        repo: &Repository,
    ) -> Result<bool, ProviderError> {
        if let Some(re) = &self.repository_match {
            if !re.is_match(&repo.repository) {
                return Ok(false);
            }
        }
        if let Some(re) = &self.branch_match {
            if !re.is_match(&repo.branch) {
                return Ok(false);
            }
        }
        if let Some(re) = &self.label_match {
            if !repo.labels.iter().any(|label| re.is_match(label)) {
                return Ok(false);
            }
        }
        for path in self.paths_exist {
            if !lister.repo_has_path(repo, path.trim_end_matches('/')).await? {
                return Ok(false);
            }
        }
        for path in self.paths_do_not_exist {
            if lister.repo_has_path(repo, path.trim_end_matches('/')).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Keep the repositories matching at least one of `filters`; no filters keeps everything
async fn retain_matching<L: RepositoryLister + ?Sized>(
    lister: &L,
    repos: Vec<Repository>,
    filters: &[&CompiledFilter<'_>],
) -> Result<Vec<Repository>, ProviderError> {
    if filters.is_empty() {
        return Ok(repos);
    }

    let mut kept = Vec::with_capacity(repos.len());
    for repo in repos {
        let mut keep = false;
        for filter in filters {
            if filter.matches(lister, &repo).await? {
                keep = true;
                break;
            }
        }
        if keep {
            kept.push(repo);
        } else {
            debug!(
                "Filtered out {}/{} at branch {:?}",
                repo.organization, repo.repository, repo.branch
            );
        }
    }
    Ok(kept)
}

/// List repositories and branches from `lister` that pass `filters`
///
/// Output order follows the provider: repositories in listing order, each
/// followed by its branches in branch-listing order.
pub async fn list_repositories<L: RepositoryLister + ?Sized>(
    lister: &L,
    filters: &[ScmProviderFilter],
    clone_protocol: Option<&str>,
) -> Result<Vec<Repository>, ProviderError> {
    let clone_protocol = CloneProtocol::parse(clone_protocol)?;
    let compiled = filters
        .iter()
        .map(CompiledFilter::compile)
        .collect::<Result<Vec<_>, _>>()?;
    let (repo_filters, branch_filters): (Vec<_>, Vec<_>) = compiled
        .iter()
        .filter(|f| f.filter_type.is_some())
        .partition(|f| f.filter_type == Some(FilterType::Repo));

    let repos = lister.list_repos(clone_protocol).await?;
    let listed = repos.len();
    let repos = retain_matching(lister, repos, &repo_filters).await?;
    debug!("{} of {} repositories passed repository filters", repos.len(), listed);

    let mut branches = Vec::new();
    for repo in &repos {
        branches.extend(lister.get_branches(repo).await?);
    }
    let expanded = branches.len();
    let branches = retain_matching(lister, branches, &branch_filters).await?;
    debug!("{} of {} branches passed branch filters", branches.len(), expanded);

    Ok(branches)
}
