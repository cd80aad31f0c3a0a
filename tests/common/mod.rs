//! Common test utilities for generator and Pact integration tests
//!
//! Provides rustls crypto provider setup, an in-memory secret store, an
//! in-memory repository lister and helpers for building generator configs.

#![allow(dead_code, reason = "each test binary uses a different subset of helpers")]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;

use scm_provider_generator::crd::{
    ApplicationSet, ApplicationSetGenerator, ApplicationSetSpec, ApplicationSetTemplate,
    ScmProviderConfig, ScmProviderGeneratorSpec, SecretRef,
};
use scm_provider_generator::error::{BoxError, ProviderError};
use scm_provider_generator::provider::{CloneProtocol, Repository, RepositoryLister};
use scm_provider_generator::secrets::SecretStore;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// This must be called before any provider client is built.
/// Uses a `Once` to ensure it's only called once across all tests.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

/// Base URL of a Pact mock server without the trailing slash
pub fn mock_base_url(url: impl ToString) -> String {
    let mut base_url = url.to_string();
    if base_url.ends_with('/') {
        base_url.pop();
    }
    base_url
}

/// In-memory [`SecretStore`] counting lookups
#[derive(Default)]
pub struct MapSecretStore {
    secrets: HashMap<(String, String), BTreeMap<String, ByteString>>,
    pub lookups: AtomicUsize,
}

impl MapSecretStore {
    pub fn with_secret(mut self, namespace: &str, name: &str, key: &str, value: &str) -> Self {
        self.secrets
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .insert(key.to_string(), ByteString(value.as_bytes().to_vec()));
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretStore for MapSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Secret, BoxError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let data = self
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| format!("secrets \"{name}\" not found"))?;
        Ok(Secret {
            data: Some(data),
            ..Default::default()
        })
    }
}

/// In-memory lister: repositories with their branches, in listing order
#[derive(Debug, Default, Clone)]
pub struct FakeLister {
    repos: Vec<(Repository, Vec<String>)>,
}

impl FakeLister {
    pub fn repo(mut self, organization: &str, name: &str, labels: &[&str], branches: &[&str]) -> Self {
        let repo = Repository {
            organization: organization.to_string(),
            repository: name.to_string(),
            url: format!("git@github.com:{organization}/{name}.git"),
            branch: branches.first().map(ToString::to_string).unwrap_or_default(),
            labels: labels.iter().map(ToString::to_string).collect(),
            ..Default::default()
        };
        self.repos
            .push((repo, branches.iter().map(ToString::to_string).collect()));
        self
    }
}

#[async_trait]
impl RepositoryLister for FakeLister {
    async fn list_repos(
        &self,
        _clone_protocol: CloneProtocol,
    ) -> Result<Vec<Repository>, ProviderError> {
        // Yield between calls so concurrent generations interleave
        tokio::task::yield_now().await;
        Ok(self.repos.iter().map(|(repo, _)| repo.clone()).collect())
    }

    async fn repo_has_path(&self, _repo: &Repository, _path: &str) -> Result<bool, ProviderError> {
        Ok(false)
    }

    async fn get_branches(&self, repo: &Repository) -> Result<Vec<Repository>, ProviderError> {
        tokio::task::yield_now().await;
        let branches = self
            .repos
            .iter()
            .find(|(r, _)| r.organization == repo.organization && r.repository == repo.repository)
            .map(|(_, branches)| branches.clone())
            .unwrap_or_default();
        Ok(branches
            .iter()
            .map(|branch| repo.with_branch(branch.as_str(), format!("{}-{branch}", repo.repository)))
            .collect())
    }
}

pub fn secret_ref(name: &str, key: &str) -> SecretRef {
    SecretRef {
        secret_name: name.to_string(),
        key: key.to_string(),
    }
}

/// Generator entry for `provider` with default settings
pub fn scm_generator(provider: ScmProviderConfig) -> ApplicationSetGenerator {
    ApplicationSetGenerator {
        scm_provider: Some(ScmProviderGeneratorSpec {
            provider: Some(provider),
            ..Default::default()
        }),
    }
}

/// ApplicationSet named `name` in `namespace` without generators
pub fn application_set(name: &str, namespace: &str) -> ApplicationSet {
    let mut app_set = ApplicationSet::new(
        name,
        ApplicationSetSpec {
            generators: Vec::new(),
            template: ApplicationSetTemplate::default(),
        },
    );
    app_set.metadata.namespace = Some(namespace.to_string());
    app_set
}
