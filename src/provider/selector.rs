//! # Provider Selector
//!
//! Builds the [`RepositoryLister`] for the active provider configuration,
//! resolving its credentials from the secret store first.
//!
//! The selector is stateless apart from its secret store handle: every call
//! resolves credentials again and returns a fresh client owned by the caller.

use async_trait::async_trait;
use tracing::debug;

use super::azure_devops::AzureDevOpsProvider;
use super::bitbucket_server::BitbucketServerProvider;
use super::gitea::GiteaProvider;
use super::github::GithubProvider;
use super::gitlab::GitlabProvider;
use super::RepositoryLister;
use crate::crd::{ProviderKind, ScmProviderConfig, SecretRef};
use crate::error::{GeneratorError, ProviderError};
use crate::secrets::{SecretResolver, SecretStore};

/// Source of provider clients for the generator
///
/// [`ProviderSelector`] is the production implementation; tests substitute
/// factories returning in-memory listers.
#[async_trait]
pub trait ListerFactory: Send + Sync {
    /// Build a client for `provider`, resolving secrets in `namespace`
    async fn build(
        &self,
        provider: &ScmProviderConfig,
        namespace: &str,
    ) -> Result<Box<dyn RepositoryLister>, GeneratorError>;
}

/// Constructs provider clients with credentials read from a [`SecretStore`]
#[derive(Debug, Clone)]
pub struct ProviderSelector<S> {
    resolver: SecretResolver<S>,
}

impl<S: SecretStore> ProviderSelector<S> {
    pub fn new(store: S) -> Self {
        Self {
            resolver: SecretResolver::new(store),
        }
    }

    async fn credential(
        &self,
        kind: ProviderKind,
        credential: &'static str,
        secret_ref: Option<&SecretRef>,
        namespace: &str,
    ) -> Result<String, GeneratorError> {
        self.resolver
            .resolve(secret_ref, namespace)
            .await
            .map_err(|source| GeneratorError::Secret {
                kind,
                credential,
                source,
            })
    }

    /// Build the client for the active provider kind in `provider`
    pub async fn select(
        &self,
        provider: &ScmProviderConfig,
        namespace: &str,
    ) -> Result<Box<dyn RepositoryLister>, GeneratorError> {
        let kind = provider.kind();
        debug!("Selecting {} provider in namespace {}", kind, namespace);

        let init = |source: ProviderError| GeneratorError::ProviderInit { kind, source };

        let lister: Box<dyn RepositoryLister> = match provider {
            ScmProviderConfig::Github(config) => {
                let token = self
                    .credential(kind, "token", config.token_ref.as_ref(), namespace)
                    .await?;
                Box::new(
                    GithubProvider::new(
                        &config.organization,
                        token,
                        config.api.as_deref(),
                        config.all_branches,
                    )
                    .map_err(init)?,
                )
            }
            ScmProviderConfig::Gitlab(config) => {
                let token = self
                    .credential(kind, "token", config.token_ref.as_ref(), namespace)
                    .await?;
                Box::new(
                    GitlabProvider::new(
                        &config.group,
                        token,
                        config.api.as_deref(),
                        config.all_branches,
                        config.include_subgroups,
                    )
                    .map_err(init)?,
                )
            }
            ScmProviderConfig::Gitea(config) => {
                let token = self
                    .credential(kind, "token", config.token_ref.as_ref(), namespace)
                    .await?;
                Box::new(
                    GiteaProvider::new(
                        &config.owner,
                        token,
                        &config.api,
                        config.insecure,
                        config.all_branches,
                    )
                    .map_err(init)?,
                )
            }
            ScmProviderConfig::BitbucketServer(config) => match &config.basic_auth {
                Some(basic_auth) => {
                    let password = self
                        .credential(kind, "password", Some(&basic_auth.password_ref), namespace)
                        .await?;
                    Box::new(
                        BitbucketServerProvider::new_basic_auth(
                            &config.project,
                            &config.api,
                            basic_auth.username.clone(),
                            password,
                            config.all_branches,
                        )
                        .map_err(init)?,
                    )
                }
                None => Box::new(
                    BitbucketServerProvider::new_no_auth(
                        &config.project,
                        &config.api,
                        config.all_branches,
                    )
                    .map_err(init)?,
                ),
            },
            ScmProviderConfig::AzureDevOps(config) => {
                let access_token = self
                    .credential(
                        kind,
                        "access token",
                        Some(&config.access_token_ref),
                        namespace,
                    )
                    .await?;
                Box::new(
                    AzureDevOpsProvider::new(
                        access_token,
                        &config.organization,
                        config.api.as_deref(),
                        &config.team_project,
                        config.all_branches,
                    )
                    .map_err(init)?,
                )
            }
        };

        Ok(lister)
    }
}

#[async_trait]
impl<S: SecretStore> ListerFactory for ProviderSelector<S> {
    async fn build(
        &self,
        provider: &ScmProviderConfig,
        namespace: &str,
    ) -> Result<Box<dyn RepositoryLister>, GeneratorError> {
        self.select(provider, namespace).await
    }
}
