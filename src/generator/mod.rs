//! # SCM Provider Generator
//!
//! Turns one `scmProvider` generator entry of an ApplicationSet into a list
//! of parameter bundles, one per matched repository branch.
//!
//! Flow of [`Generator::generate_params`]:
//! 1. Validate that the generator has an `scmProvider` section naming a provider
//! 2. Build the provider client through the [`ListerFactory`] (credentials
//!    are resolved from Secrets in the ApplicationSet's namespace)
//! 3. List repositories and branches, applying `filters` and `cloneProtocol`
//! 4. Normalize every match into a [`ParameterBundle`]
//!
//! Every call is independent: nothing is cached and no state is shared
//! between calls, so one generator can serve concurrent reconciliations.

use async_trait::async_trait;
use kube::ResourceExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{field, info, info_span, warn, Instrument};

use crate::constants::{DEFAULT_NAMESPACE, DEFAULT_SCM_PROVIDER_REQUEUE_AFTER_SECS};
use crate::crd::{ApplicationSet, ApplicationSetGenerator, ApplicationSetTemplate};
use crate::error::GeneratorError;
use crate::provider::selector::{ListerFactory, ProviderSelector};
use crate::secrets::KubeSecretStore;

mod params;

pub use params::{normalize, repository_params, sanitize_name, ParameterBundle};

/// Interface the ApplicationSet controller drives every generator through
#[async_trait]
pub trait Generator: Send + Sync {
    /// How long the controller waits before regenerating
    fn requeue_after(&self, generator: &ApplicationSetGenerator) -> Duration;

    /// Template declared on the generator itself, if any
    fn template<'a>(
        &self,
        generator: &'a ApplicationSetGenerator,
    ) -> Option<&'a ApplicationSetTemplate>;

    /// Parameter bundles for `generator`, a member of `app_set`
    async fn generate_params(
        &self,
        generator: &ApplicationSetGenerator,
        app_set: &ApplicationSet,
    ) -> Result<Vec<ParameterBundle>, GeneratorError>;
}

/// Generator for `scmProvider` entries
#[derive(Clone)]
pub struct ScmProviderGenerator {
    factory: Arc<dyn ListerFactory>,
}

impl std::fmt::Debug for ScmProviderGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScmProviderGenerator").finish_non_exhaustive()
    }
}

impl ScmProviderGenerator {
    /// Generator reading provider credentials from Kubernetes Secrets
    pub fn new(client: kube::Client) -> Self {
        Self::with_factory(Arc::new(ProviderSelector::new(KubeSecretStore::new(client))))
    }

    /// Generator building provider clients through `factory`
    pub fn with_factory(factory: Arc<dyn ListerFactory>) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl Generator for ScmProviderGenerator {
    fn requeue_after(&self, generator: &ApplicationSetGenerator) -> Duration {
        match generator
            .scm_provider
            .as_ref()
            .and_then(|spec| spec.requeue_after_seconds)
        {
            Some(seconds) => u64::try_from(seconds).map_or_else(
                |_| {
                    warn!(
                        "requeueAfterSeconds is negative ({}), requeueing without delay",
                        seconds
                    );
                    Duration::ZERO
                },
                |seconds| {
                    if seconds == 0 {
                        warn!("requeueAfterSeconds is 0, requeueing without delay");
                    }
                    Duration::from_secs(seconds)
                },
            ),
            None => Duration::from_secs(DEFAULT_SCM_PROVIDER_REQUEUE_AFTER_SECS),
        }
    }

    fn template<'a>(
        &self,
        generator: &'a ApplicationSetGenerator,
    ) -> Option<&'a ApplicationSetTemplate> {
        generator.scm_provider.as_ref().map(|spec| &spec.template)
    }

    async fn generate_params(
        &self,
        generator: &ApplicationSetGenerator,
        app_set: &ApplicationSet,
    ) -> Result<Vec<ParameterBundle>, GeneratorError> {
        let spec = generator
            .scm_provider
            .as_ref()
            .ok_or(GeneratorError::MissingConfig)?;
        let provider = spec
            .provider
            .as_ref()
            .ok_or(GeneratorError::NoProviderConfigured)?;
        let kind = provider.kind();
        let namespace = app_set
            .namespace()
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let span = info_span!(
            "scm_provider.generate",
            provider.kind = %kind,
            namespace = %namespace,
            application_set = %app_set.name_any(),
            repositories.count = field::Empty,
            operation.duration_ms = field::Empty,
        );
        let span_clone = span.clone();
        let start = Instant::now();

        async move {
            let lister = self.factory.build(provider, &namespace).await?;
            let repos = lister
                .list_repositories(&spec.filters, spec.clone_protocol.as_deref())
                .await
                .map_err(|source| GeneratorError::List { kind, source })?;

            let params = normalize(&repos);
            span_clone.record("repositories.count", params.len());
            span_clone.record(
                "operation.duration_ms",
                u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            );
            info!("Generated {} parameter sets from {}", params.len(), kind);
            Ok::<_, GeneratorError>(params)
        }
        .instrument(span)
        .await
    }
}
