//! Pact contract tests for the GitHub REST API
//!
//! These tests define the contract between the generator and the GitHub API:
//! 1. Start a Pact mock server with the expected interactions
//! 2. Point the provider `api` at the mock server
//! 3. Run the real GitHub client (directly or through the generator)
//! 4. The mock server verifies every interaction was exercised

#[cfg(test)]
mod common;

use common::{application_set, init_rustls, mock_base_url, scm_generator, secret_ref, MapSecretStore};
use pact_consumer::prelude::*;
use serde_json::json;
use std::sync::Arc;

use scm_provider_generator::crd::{GithubConfig, ScmProviderConfig, ScmProviderFilter};
use scm_provider_generator::provider::github::GithubProvider;
use scm_provider_generator::provider::selector::ProviderSelector;
use scm_provider_generator::provider::{CloneProtocol, RepositoryLister};
use scm_provider_generator::{Generator, ScmProviderGenerator};

fn github_repo(name: &str, topics: &[&str]) -> serde_json::Value {
    json!({
        "name": name,
        "full_name": format!("acme/{name}"),
        "clone_url": format!("https://github.com/acme/{name}.git"),
        "ssh_url": format!("git@github.com:acme/{name}.git"),
        "default_branch": "main",
        "topics": topics,
    })
}

#[tokio::test]
async fn test_github_generate_params_through_selector() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("SCM-Provider-Generator", "GitHub-API");

    pact_builder.interaction("list organization repositories", "", |mut i| {
        i.given("organization acme has repositories svc and tools");
        i.request
            .method("GET")
            .path("/orgs/acme/repos")
            .query_param("per_page", "100")
            .header("authorization", "Bearer abc123");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([github_repo("svc", &["team-a"]), github_repo("tools", &[])]));
        i
    });
    pact_builder.interaction("list branches of svc", "", |mut i| {
        i.given("repository acme/svc has branches main and dev");
        i.request
            .method("GET")
            .path("/repos/acme/svc/branches")
            .query_param("per_page", "100")
            .header("authorization", "Bearer abc123");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([
                { "name": "main", "commit": { "sha": "1111111" } },
                { "name": "dev", "commit": { "sha": "2222222" } }
            ]));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let base_url = mock_base_url(mock_server.url());

    let store = Arc::new(MapSecretStore::default().with_secret("ns1", "tok", "token", "abc123"));
    let generator =
        ScmProviderGenerator::with_factory(Arc::new(ProviderSelector::new(Arc::clone(&store))));

    let mut entry = scm_generator(ScmProviderConfig::Github(GithubConfig {
        organization: "acme".to_string(),
        api: Some(base_url),
        token_ref: Some(secret_ref("tok", "token")),
        all_branches: true,
    }));
    if let Some(spec) = entry.scm_provider.as_mut() {
        spec.filters = vec![ScmProviderFilter {
            repository_match: Some("^svc$".to_string()),
            ..Default::default()
        }];
    }

    let params = generator
        .generate_params(&entry, &application_set("services", "ns1"))
        .await
        .expect("generation succeeds");

    assert_eq!(params.len(), 2);
    assert_eq!(params[0]["organization"], "acme");
    assert_eq!(params[0]["repository"], "svc");
    assert_eq!(params[0]["branch"], "main");
    assert_eq!(params[0]["branchNormalized"], "main");
    assert_eq!(params[0]["sha"], "1111111");
    assert_eq!(params[0]["url"], "git@github.com:acme/svc.git");
    assert_eq!(params[0]["labels"], "team-a");
    assert_eq!(params[1]["branch"], "dev");
    assert_eq!(params[1]["branchNormalized"], "dev");
    assert_eq!(params[1]["sha"], "2222222");
    assert_eq!(store.lookups(), 1);
}

#[tokio::test]
async fn test_github_default_branch_and_path_filters() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("SCM-Provider-Generator", "GitHub-API");

    pact_builder.interaction("list organization repositories anonymously", "", |mut i| {
        i.given("organization acme has repository svc");
        i.request
            .method("GET")
            .path("/orgs/acme/repos")
            .query_param("per_page", "100");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([github_repo("svc", &[])]));
        i
    });
    pact_builder.interaction("get default branch of svc", "", |mut i| {
        i.given("repository acme/svc has branch main");
        i.request.method("GET").path("/repos/acme/svc/branches/main");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "name": "main", "commit": { "sha": "3333333" } }));
        i
    });
    pact_builder.interaction("deploy directory exists on main", "", |mut i| {
        i.given("repository acme/svc has deploy/ on main");
        i.request
            .method("GET")
            .path("/repos/acme/svc/contents/deploy")
            .query_param("ref", "main");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([{ "name": "kustomization.yaml", "type": "file" }]));
        i
    });
    pact_builder.interaction("skip-ci marker is absent on main", "", |mut i| {
        i.given("repository acme/svc has no .skip-ci on main");
        i.request
            .method("GET")
            .path("/repos/acme/svc/contents/.skip-ci")
            .query_param("ref", "main");
        i.response
            .status(404)
            .header("content-type", "application/json")
            .json_body(json!({ "message": "Not Found" }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let base_url = mock_base_url(mock_server.url());

    let provider = GithubProvider::new("acme", String::new(), Some(&base_url), false)
        .expect("client builds");
    let filters = vec![ScmProviderFilter {
        paths_exist: vec!["deploy/".to_string()],
        paths_do_not_exist: vec![".skip-ci".to_string()],
        ..Default::default()
    }];

    let repos = provider
        .list_repositories(&filters, Some("https"))
        .await
        .expect("listing succeeds");

    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].branch, "main");
    assert_eq!(repos[0].sha, "3333333");
    assert_eq!(repos[0].url, "https://github.com/acme/svc.git");
}

#[tokio::test]
async fn test_github_api_error_is_surfaced() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("SCM-Provider-Generator", "GitHub-API");

    pact_builder.interaction("list repositories with a revoked token", "", |mut i| {
        i.given("the token is revoked");
        i.request
            .method("GET")
            .path("/orgs/acme/repos")
            .query_param("per_page", "100")
            .header("authorization", "Bearer revoked");
        i.response
            .status(401)
            .header("content-type", "application/json")
            .json_body(json!({ "message": "Bad credentials" }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let base_url = mock_base_url(mock_server.url());

    let provider = GithubProvider::new("acme", "revoked".to_string(), Some(&base_url), false)
        .expect("client builds");
    let err = provider
        .list_repositories(&[], None)
        .await
        .expect_err("unauthorized");

    match err {
        scm_provider_generator::ProviderError::Api { status, body, .. } => {
            assert_eq!(status.as_u16(), 401);
            assert!(body.contains("Bad credentials"));
        }
        other => panic!("Expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_github_list_repos_follows_link_header() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("SCM-Provider-Generator", "GitHub-API");

    pact_builder.interaction("list organization repositories, first page", "", |mut i| {
        i.given("organization acme has repositories svc and web over two pages");
        i.request
            .method("GET")
            .path("/orgs/acme/repos")
            .query_param("per_page", "100");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .header("link", r#"</orgs/acme/repos?per_page=100&page=2>; rel="next""#)
            .json_body(json!([github_repo("svc", &[])]));
        i
    });
    pact_builder.interaction("list organization repositories, second page", "", |mut i| {
        i.given("organization acme has repositories svc and web over two pages");
        i.request
            .method("GET")
            .path("/orgs/acme/repos")
            .query_param("per_page", "100")
            .query_param("page", "2");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([github_repo("web", &["frontend"])]));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let base_url = mock_base_url(mock_server.url());

    let provider = GithubProvider::new("acme", String::new(), Some(&base_url), false)
        .expect("client builds");
    let repos = provider
        .list_repos(CloneProtocol::Ssh)
        .await
        .expect("listing succeeds");

    let names: Vec<&str> = repos.iter().map(|r| r.repository.as_str()).collect();
    assert_eq!(names, vec!["svc", "web"]);
    assert_eq!(repos[1].labels, vec!["frontend".to_string()]);
    assert_eq!(repos[1].url, "git@github.com:acme/web.git");
}
