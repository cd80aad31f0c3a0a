//! # Secret Resolution
//!
//! Resolves [`SecretRef`]s to credential values.
//!
//! Provider credentials are never embedded in the generator configuration;
//! they live in Kubernetes Secrets in the namespace of the parent
//! ApplicationSet. Each generation call reads them once; nothing is cached.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use std::sync::Arc;
use tracing::debug;

use crate::crd::SecretRef;
use crate::error::{BoxError, SecretError};

/// Read-only access to secret objects
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the secret `name` in `namespace`
    async fn get(&self, namespace: &str, name: &str) -> Result<Secret, BoxError>;
}

#[async_trait]
impl<S: SecretStore + ?Sized> SecretStore for Arc<S> {
    async fn get(&self, namespace: &str, name: &str) -> Result<Secret, BoxError> {
        (**self).get(namespace, name).await
    }
}

/// [`SecretStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretStore {
    client: kube::Client,
}

impl KubeSecretStore {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }
}

impl std::fmt::Debug for KubeSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSecretStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<Secret, BoxError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        Ok(secrets.get(name).await?)
    }
}

/// Resolves optional secret references against a [`SecretStore`]
#[derive(Debug, Clone)]
pub struct SecretResolver<S> {
    store: S,
}

impl<S: SecretStore> SecretResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    /// Resolve `secret_ref` in `namespace`
    ///
    /// An absent reference resolves to an empty string without touching the
    /// store, which is how providers with optional credentials fall back to
    /// anonymous access.
    pub async fn resolve(
        &self,
        secret_ref: Option<&SecretRef>,
        namespace: &str,
    ) -> Result<String, SecretError> {
        let Some(secret_ref) = secret_ref else {
            return Ok(String::new());
        };

        debug!(
            "Resolving key {} of secret {}/{}",
            secret_ref.key, namespace, secret_ref.secret_name
        );

        let secret = self
            .store
            .get(namespace, &secret_ref.secret_name)
            .await
            .map_err(|source| SecretError::Fetch {
                namespace: namespace.to_string(),
                name: secret_ref.secret_name.clone(),
                source,
            })?;

        let bytes = secret
            .data
            .as_ref()
            .and_then(|data| data.get(&secret_ref.key))
            .ok_or_else(|| SecretError::KeyMissing {
                namespace: namespace.to_string(),
                name: secret_ref.secret_name.clone(),
                key: secret_ref.key.clone(),
            })?;

        String::from_utf8(bytes.0.clone()).map_err(|source| SecretError::InvalidUtf8 {
            namespace: namespace.to_string(),
            name: secret_ref.secret_name.clone(),
            key: secret_ref.key.clone(),
            source,
        })
    }
}
