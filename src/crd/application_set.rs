//! # ApplicationSet
//!
//! The parent resource of the generator. Only the fields this crate reads
//! are modelled; everything else in the object is ignored.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::generator::ScmProviderGeneratorSpec;
use super::template::ApplicationSetTemplate;

/// ApplicationSet Custom Resource
///
/// # Example
///
/// ```yaml
/// apiVersion: argoproj.io/v1alpha1
/// kind: ApplicationSet
/// metadata:
///   name: services
///   namespace: argocd
/// spec:
///   generators:
///     - scmProvider:
///         github:
///           organization: acme
///   template:
///     metadata:
///       name: '{{repository}}-{{branchNormalized}}'
/// ```
#[derive(kube::CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ApplicationSet",
    group = "argoproj.io",
    version = "v1alpha1",
    namespaced,
    shortname = "appset"
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSetSpec {
    #[serde(default)]
    pub generators: Vec<ApplicationSetGenerator>,
    #[serde(default)]
    pub template: ApplicationSetTemplate,
}

/// One entry of `spec.generators`
/// Generator kinds other than `scmProvider` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSetGenerator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scm_provider: Option<ScmProviderGeneratorSpec>,
}
