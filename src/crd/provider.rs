//! # Provider Configuration
//!
//! SCM provider configuration types for GitHub, GitLab, Gitea, Bitbucket Server
//! and Azure DevOps.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// SCM provider configuration
/// Exactly one provider kind is active; it is chosen when the generator spec
/// is parsed (see [`crate::crd::ScmProviderGeneratorSpec`]).
/// Kubernetes sends data in format: {"github": {...}}
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum ScmProviderConfig {
    /// GitHub or GitHub Enterprise organization
    Github(GithubConfig),
    /// GitLab group
    Gitlab(GitlabConfig),
    /// Gitea owner (organization)
    Gitea(GiteaConfig),
    /// Bitbucket Server project
    BitbucketServer(BitbucketServerConfig),
    /// Azure DevOps team project
    AzureDevOps(AzureDevOpsConfig),
}

impl ScmProviderConfig {
    /// Provider kind of the active configuration
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Github(_) => ProviderKind::Github,
            Self::Gitlab(_) => ProviderKind::Gitlab,
            Self::Gitea(_) => ProviderKind::Gitea,
            Self::BitbucketServer(_) => ProviderKind::BitbucketServer,
            Self::AzureDevOps(_) => ProviderKind::AzureDevOps,
        }
    }
}

/// Closed set of supported provider kinds
///
/// The declaration order is the priority order in which configuration keys
/// are documented and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Github,
    Gitlab,
    Gitea,
    BitbucketServer,
    AzureDevOps,
}

impl ProviderKind {
    /// Configuration key of this kind inside `scmProvider`
    pub fn config_key(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Gitlab => "gitlab",
            Self::Gitea => "gitea",
            Self::BitbucketServer => "bitbucketServer",
            Self::AzureDevOps => "azureDevOps",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Github => "Github",
            Self::Gitlab => "Gitlab",
            Self::Gitea => "Gitea",
            Self::BitbucketServer => "Bitbucket Server",
            Self::AzureDevOps => "Azure DevOps",
        })
    }
}

/// Reference to a key inside a Kubernetes Secret
/// The Secret is looked up in the namespace of the parent ApplicationSet
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretRef {
    /// Name of the Secret
    pub secret_name: String,
    /// Key within the Secret's data
    pub key: String,
}

/// GitHub configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GithubConfig {
    /// GitHub org to scan. Required.
    pub organization: String,
    /// The GitHub API URL to talk to. If blank, use https://api.github.com/.
    #[serde(default)]
    pub api: Option<String>,
    /// Authentication token reference. If not set, requests are anonymous.
    #[serde(default)]
    pub token_ref: Option<SecretRef>,
    /// Scan all branches instead of just the default branch.
    #[serde(default)]
    pub all_branches: bool,
}

/// GitLab configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GitlabConfig {
    /// Gitlab group to scan. Required. You can use either the project id (recommended) or the full namespaced path.
    pub group: String,
    /// Recurse through subgroups (true) or scan only the base group (false).
    #[serde(default)]
    pub include_subgroups: bool,
    /// The Gitlab API URL to talk to.
    #[serde(default)]
    pub api: Option<String>,
    /// Authentication token reference.
    #[serde(default)]
    pub token_ref: Option<SecretRef>,
    /// Scan all branches instead of just the default branch.
    #[serde(default)]
    pub all_branches: bool,
}

/// Gitea configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GiteaConfig {
    /// Gitea organization or user to scan. Required.
    pub owner: String,
    /// The Gitea URL to talk to. For example https://gitea.mydomain.com/.
    pub api: String,
    /// Authentication token reference.
    #[serde(default)]
    pub token_ref: Option<SecretRef>,
    /// Scan all branches instead of just the default branch.
    #[serde(default)]
    pub all_branches: bool,
    /// Allow self-signed TLS / Certificates; default: false
    #[serde(default)]
    pub insecure: bool,
}

/// Bitbucket Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketServerConfig {
    /// Project to scan. Required.
    pub project: String,
    /// The Bitbucket Server REST API URL to talk to. Required.
    pub api: String,
    /// Credentials for Basic auth. Anonymous access is used when unset.
    #[serde(default)]
    pub basic_auth: Option<BasicAuthConfig>,
    /// Scan all branches instead of just the default branch.
    #[serde(default)]
    pub all_branches: bool,
}

/// Basic auth credentials: a plain username and a password held in a Secret
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BasicAuthConfig {
    /// Username for Basic auth
    pub username: String,
    /// Password (or personal access token) reference.
    pub password_ref: SecretRef,
}

/// Azure DevOps configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AzureDevOpsConfig {
    /// Azure Devops organization. Required. E.g. "my-organization".
    pub organization: String,
    /// The URL to Azure DevOps. If blank, use https://dev.azure.com.
    #[serde(default)]
    pub api: Option<String>,
    /// Azure Devops team project. Required. E.g. "my-team".
    pub team_project: String,
    /// The Personal Access Token (PAT) to use when connecting. Required.
    pub access_token_ref: SecretRef,
    /// Scan all branches instead of just the default branch.
    #[serde(default)]
    pub all_branches: bool,
}
