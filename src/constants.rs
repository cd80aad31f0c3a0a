//! # Constants
//!
//! Shared constants used throughout the generator.
//!
//! These values represent reasonable defaults and can be overridden via
//! the generator configuration where applicable.

/// Default requeue interval for the SCM provider generator (seconds)
/// Used when `requeueAfterSeconds` is not set on the generator
pub const DEFAULT_SCM_PROVIDER_REQUEUE_AFTER_SECS: u64 = 30 * 60;

/// Default GitHub REST API endpoint
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Default GitLab endpoint (the `/api/v4` prefix is appended by the client)
pub const DEFAULT_GITLAB_API_URL: &str = "https://gitlab.com";

/// Default Azure DevOps endpoint
pub const DEFAULT_AZURE_DEVOPS_API_URL: &str = "https://dev.azure.com";

/// Azure DevOps REST API version sent with every request
pub const AZURE_DEVOPS_API_VERSION: &str = "7.0";

/// Page size requested from providers that support it
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Gitea caps `limit` at 50 by default
pub const GITEA_PAGE_SIZE: u32 = 50;

/// User agent sent to SCM provider APIs (GitHub rejects requests without one)
pub const USER_AGENT: &str = concat!("scm-provider-generator/", env!("CARGO_PKG_VERSION"));

/// Namespace used when the parent ApplicationSet carries none
pub const DEFAULT_NAMESPACE: &str = "default";
