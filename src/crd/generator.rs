//! # SCM Provider Generator Spec
//!
//! The `scmProvider` section of an ApplicationSet generator.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::provider::{
    AzureDevOpsConfig, BitbucketServerConfig, GiteaConfig, GithubConfig, GitlabConfig,
    ScmProviderConfig,
};
use super::template::ApplicationSetTemplate;

/// SCM provider generator configuration
///
/// # Example
///
/// ```yaml
/// scmProvider:
///   github:
///     organization: acme
///     tokenRef:
///       secretName: github-token
///       key: token
///   cloneProtocol: https
///   filters:
///     - repositoryMatch: ^svc-
///   requeueAfterSeconds: 600
/// ```
///
/// At most one provider kind may be present. A document naming two or more
/// kinds is rejected at parse time; a document naming none parses with
/// `provider: None` and fails when parameters are generated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScmProviderGeneratorSpec {
    /// The active SCM provider
    #[serde(flatten)]
    pub provider: Option<ScmProviderConfig>,
    /// Filters for which repos should be considered.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<ScmProviderFilter>,
    /// Which protocol to use for the SCM URL. Default is provider-specific but ssh if possible.
    /// Not all providers necessarily support all protocols.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone_protocol: Option<String>,
    /// Standard parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requeue_after_seconds: Option<i64>,
    #[serde(default)]
    pub template: ApplicationSetTemplate,
}

/// A single repository filter
/// If multiple filter types are set on a single struct, they will be AND'd together.
/// All filters must pass for a repo to be included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScmProviderFilter {
    /// A regex for repo names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_match: Option<String>,
    /// An array of paths, all of which must exist.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths_exist: Vec<String>,
    /// An array of paths, all of which must not exist.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths_do_not_exist: Vec<String>,
    /// A regex which must match at least one label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_match: Option<String>,
    /// A regex which must match the branch name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_match: Option<String>,
}

impl<'de> Deserialize<'de> for ScmProviderGeneratorSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, MapAccess, Visitor};
        use std::fmt;

        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = ScmProviderGeneratorSpec;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an scmProvider object with at most one provider field")
            }

            fn visit_map<M>(self, mut map: M) -> Result<Self::Value, M::Error>
            where
                M: MapAccess<'de>,
            {
                let mut providers: Vec<ScmProviderConfig> = Vec::new();
                let mut filters: Option<Vec<ScmProviderFilter>> = None;
                let mut clone_protocol: Option<Option<String>> = None;
                let mut requeue_after_seconds: Option<Option<i64>> = None;
                let mut template: Option<ApplicationSetTemplate> = None;

                while let Some(key) = map.next_key::<String>()? {
                    // `null` sub-configurations count as absent
                    let provider = match key.as_str() {
                        "github" => map
                            .next_value::<Option<GithubConfig>>()?
                            .map(ScmProviderConfig::Github),
                        "gitlab" => map
                            .next_value::<Option<GitlabConfig>>()?
                            .map(ScmProviderConfig::Gitlab),
                        "gitea" => map
                            .next_value::<Option<GiteaConfig>>()?
                            .map(ScmProviderConfig::Gitea),
                        "bitbucketServer" => map
                            .next_value::<Option<BitbucketServerConfig>>()?
                            .map(ScmProviderConfig::BitbucketServer),
                        "azureDevOps" => map
                            .next_value::<Option<AzureDevOpsConfig>>()?
                            .map(ScmProviderConfig::AzureDevOps),
                        "filters" => {
                            if filters.is_some() {
                                return Err(de::Error::duplicate_field("filters"));
                            }
                            filters = Some(map.next_value::<Option<_>>()?.unwrap_or_default());
                            None
                        }
                        "cloneProtocol" => {
                            if clone_protocol.is_some() {
                                return Err(de::Error::duplicate_field("cloneProtocol"));
                            }
                            clone_protocol = Some(map.next_value()?);
                            None
                        }
                        "requeueAfterSeconds" => {
                            if requeue_after_seconds.is_some() {
                                return Err(de::Error::duplicate_field("requeueAfterSeconds"));
                            }
                            requeue_after_seconds = Some(map.next_value()?);
                            None
                        }
                        "template" => {
                            if template.is_some() {
                                return Err(de::Error::duplicate_field("template"));
                            }
                            template = Some(map.next_value::<Option<_>>()?.unwrap_or_default());
                            None
                        }
                        _ => {
                            let _: de::IgnoredAny = map.next_value()?;
                            None
                        }
                    };
                    if let Some(provider) = provider {
                        providers.push(provider);
                    }
                }

                if providers.len() > 1 {
                    let kinds: Vec<&str> = providers.iter().map(|p| p.kind().config_key()).collect();
                    return Err(de::Error::custom(format!(
                        "multiple SCM provider kinds specified: {}",
                        kinds.join(", ")
                    )));
                }

                Ok(ScmProviderGeneratorSpec {
                    provider: providers.pop(),
                    filters: filters.unwrap_or_default(),
                    clone_protocol: clone_protocol.flatten(),
                    requeue_after_seconds: requeue_after_seconds.flatten(),
                    template: template.unwrap_or_default(),
                })
            }
        }

        deserializer.deserialize_map(SpecVisitor)
    }
}
