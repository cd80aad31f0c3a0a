//! # Parameter Normalization
//!
//! Flattens matched repositories into the string-keyed parameter bundles
//! consumed by ApplicationSet templates.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::provider::Repository;

/// Flat parameter set emitted for one repository branch
pub type ParameterBundle = BTreeMap<String, String>;

pub const PARAM_ORGANIZATION: &str = "organization";
pub const PARAM_REPOSITORY: &str = "repository";
pub const PARAM_URL: &str = "url";
pub const PARAM_BRANCH: &str = "branch";
pub const PARAM_SHA: &str = "sha";
pub const PARAM_LABELS: &str = "labels";
pub const PARAM_BRANCH_NORMALIZED: &str = "branchNormalized";

static INVALID_NAME_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-zA-Z0-9-]").unwrap_or_else(|e| panic!("invalid static regex: {e}"))
});

/// Make `name` usable as a Kubernetes resource name fragment
///
/// Every character other than an ASCII letter, digit or `-` becomes `-`,
/// and the result is lower-cased: `feature/X_1` → `feature-x-1`.
pub fn sanitize_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "-").to_lowercase()
}

/// Parameters for one repository branch
pub fn repository_params(repo: &Repository) -> ParameterBundle {
    BTreeMap::from([
        (PARAM_ORGANIZATION.to_string(), repo.organization.clone()),
        (PARAM_REPOSITORY.to_string(), repo.repository.clone()),
        (PARAM_URL.to_string(), repo.url.clone()),
        (PARAM_BRANCH.to_string(), repo.branch.clone()),
        (PARAM_SHA.to_string(), repo.sha.clone()),
        // Commas inside labels are not escaped
        (PARAM_LABELS.to_string(), repo.labels.join(",")),
        (PARAM_BRANCH_NORMALIZED.to_string(), sanitize_name(&repo.branch)),
    ])
}

/// Parameters for every repository, in input order
pub fn normalize(repos: &[Repository]) -> Vec<ParameterBundle> {
    repos.iter().map(repository_params).collect()
}
