//! SCM Provider Generator Library
//!
//! ApplicationSet `scmProvider` generator: discovers repositories and branches
//! on GitHub, GitLab, Gitea, Bitbucket Server and Azure DevOps and turns each
//! match into a flat set of template parameters.
//!
//! ## Module Structure
//!
//! - `crd` - ApplicationSet and generator configuration types
//! - `secrets` - Credential lookup in Kubernetes Secrets
//! - `provider` - Provider clients, repository filters and the provider selector
//! - `generator` - The generator entry points and parameter normalization
//! - `error` - Error types
//! - `constants` - Defaults shared across modules

pub mod constants;
pub mod crd;
pub mod error;
pub mod generator;
pub mod provider;
pub mod secrets;

pub use error::{GeneratorError, ProviderError, SecretError};
pub use generator::{Generator, ParameterBundle, ScmProviderGenerator};
