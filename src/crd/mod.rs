//! # Custom Resource Definitions
//!
//! Configuration types for the SCM provider generator.
//!
//! ## Module Structure
//!
//! - `application_set.rs` - The parent ApplicationSet resource and its generator list
//! - `generator.rs` - The `scmProvider` generator section and repository filters
//! - `provider.rs` - Per-provider configuration (GitHub, GitLab, Gitea, Bitbucket Server, Azure DevOps)
//! - `template.rs` - Application template carried through to the caller

mod application_set;
mod generator;
mod provider;
mod template;

// Re-export all public types
pub use application_set::{ApplicationSet, ApplicationSetGenerator, ApplicationSetSpec};
pub use generator::{ScmProviderFilter, ScmProviderGeneratorSpec};
pub use provider::{
    AzureDevOpsConfig, BasicAuthConfig, BitbucketServerConfig, GiteaConfig, GithubConfig,
    GitlabConfig, ProviderKind, ScmProviderConfig, SecretRef,
};
pub use template::{ApplicationSetTemplate, ApplicationSetTemplateMeta};
