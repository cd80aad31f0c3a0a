//! # Errors
//!
//! Error types for parameter generation.
//!
//! Every failure is returned to the caller with the stage and provider kind
//! attached. Nothing here is retried; the owning scheduler re-invokes the
//! generator after its requeue interval.

use crate::crd::ProviderKind;
use thiserror::Error;

/// Boxed error returned by [`crate::secrets::SecretStore`] implementations
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error returned by [`crate::generator::Generator::generate_params`]
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The generator carries no `scmProvider` section
    #[error("generator has no scmProvider configuration")]
    MissingConfig,

    /// The `scmProvider` section names no provider kind
    #[error("no SCM provider implementation configured")]
    NoProviderConfigured,

    /// A credential referenced by the provider configuration could not be resolved
    #[error("error fetching {kind} {credential}: {source}")]
    Secret {
        kind: ProviderKind,
        credential: &'static str,
        #[source]
        source: SecretError,
    },

    /// The provider client could not be constructed
    #[error("error initializing {kind} service: {source}")]
    ProviderInit {
        kind: ProviderKind,
        #[source]
        source: ProviderError,
    },

    /// Listing repositories at the provider failed
    #[error("error listing {kind} repos: {source}")]
    List {
        kind: ProviderKind,
        #[source]
        source: ProviderError,
    },
}

/// Error resolving a [`crate::crd::SecretRef`]
#[derive(Debug, Error)]
pub enum SecretError {
    /// The secret object could not be read (not found, forbidden, transport)
    #[error("error fetching secret {namespace}/{name}: {source}")]
    Fetch {
        namespace: String,
        name: String,
        #[source]
        source: BoxError,
    },

    /// The secret exists but has no entry for the key
    #[error("key {key:?} in secret {namespace}/{name} not found")]
    KeyMissing {
        namespace: String,
        name: String,
        key: String,
    },

    /// The value stored under the key is not UTF-8
    #[error("key {key:?} in secret {namespace}/{name} is not valid UTF-8")]
    InvalidUtf8 {
        namespace: String,
        name: String,
        key: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Error raised by a provider client while constructing or listing
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        url: String,
        body: String,
    },

    #[error("invalid API URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported clone protocol {protocol:?}")]
    UnsupportedCloneProtocol { protocol: String },

    #[error("invalid filter pattern {pattern:?}: {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A response lacked a field the listing depends on
    #[error("response is missing {0}")]
    MissingField(&'static str),
}

impl ProviderError {
    /// Build an [`ProviderError::InvalidUrl`] from any displayable reason
    pub fn invalid_url(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}
