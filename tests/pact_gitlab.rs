//! Pact contract tests for the GitLab REST API v4
//!
//! The real GitLab client runs against a Pact mock server standing in for
//! `https://gitlab.com`.

#[cfg(test)]
mod common;

use common::{init_rustls, mock_base_url};
use pact_consumer::prelude::*;
use serde_json::json;

use scm_provider_generator::crd::ScmProviderFilter;
use scm_provider_generator::provider::gitlab::GitlabProvider;
use scm_provider_generator::provider::{CloneProtocol, RepositoryLister};

fn gitlab_project(id: u64, path: &str) -> serde_json::Value {
    json!({
        "id": id,
        "path": path,
        "path_with_namespace": format!("acme/platform/{path}"),
        "namespace": { "full_path": "acme/platform" },
        "ssh_url_to_repo": format!("git@gitlab.com:acme/platform/{path}.git"),
        "http_url_to_repo": format!("https://gitlab.com/acme/platform/{path}.git"),
        "default_branch": "main",
        "topics": ["k8s"],
    })
}

#[tokio::test]
async fn test_gitlab_list_group_projects_with_subgroups() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("SCM-Provider-Generator", "GitLab-API");

    pact_builder.interaction("list group projects including subgroups", "", |mut i| {
        i.given("group acme has project svc in subgroup platform");
        i.request
            .method("GET")
            .path("/api/v4/groups/acme/projects")
            .query_param("include_subgroups", "true")
            .query_param("per_page", "100")
            .header("private-token", "glpat-123");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([gitlab_project(42, "svc")]));
        i
    });
    pact_builder.interaction("get default branch of project 42", "", |mut i| {
        i.given("project 42 has branch main");
        i.request
            .method("GET")
            .path("/api/v4/projects/42/repository/branches/main")
            .header("private-token", "glpat-123");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "name": "main", "commit": { "id": "abcdef0" } }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let base_url = mock_base_url(mock_server.url());

    let provider = GitlabProvider::new("acme", "glpat-123".to_string(), Some(&base_url), false, true)
        .expect("client builds");
    let repos = provider
        .list_repositories(&[], None)
        .await
        .expect("listing succeeds");

    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].organization, "acme/platform");
    assert_eq!(repos[0].repository, "svc");
    assert_eq!(repos[0].url, "git@gitlab.com:acme/platform/svc.git");
    assert_eq!(repos[0].branch, "main");
    assert_eq!(repos[0].sha, "abcdef0");
    assert_eq!(repos[0].labels, vec!["k8s".to_string()]);
}

#[tokio::test]
async fn test_gitlab_all_branches_with_path_filter() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("SCM-Provider-Generator", "GitLab-API");

    pact_builder.interaction("list group projects", "", |mut i| {
        i.given("group acme has project svc");
        i.request
            .method("GET")
            .path("/api/v4/groups/acme/projects")
            .query_param("include_subgroups", "false")
            .query_param("per_page", "100");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([gitlab_project(7, "svc")]));
        i
    });
    pact_builder.interaction("list branches of project 7", "", |mut i| {
        i.given("project 7 has branches main and feature/login");
        i.request
            .method("GET")
            .path("/api/v4/projects/7/repository/branches")
            .query_param("per_page", "100");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([
                { "name": "main", "commit": { "id": "0000001" } },
                { "name": "feature/login", "commit": { "id": "0000002" } }
            ]));
        i
    });
    pact_builder.interaction("list charts directory on main", "", |mut i| {
        i.given("project 7 has charts/app on main");
        i.request
            .method("GET")
            .path("/api/v4/projects/7/repository/tree")
            .query_param("path", "charts")
            .query_param("ref", "main")
            .query_param("per_page", "100");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([
                { "id": "a1", "name": "app", "type": "tree", "path": "charts/app" }
            ]));
        i
    });
    pact_builder.interaction("list charts directory on feature/login", "", |mut i| {
        i.given("project 7 has no charts directory on feature/login");
        i.request
            .method("GET")
            .path("/api/v4/projects/7/repository/tree")
            .query_param("path", "charts")
            .query_param("ref", "feature/login")
            .query_param("per_page", "100");
        i.response
            .status(404)
            .header("content-type", "application/json")
            .json_body(json!({ "message": "404 Tree Not Found" }));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let base_url = mock_base_url(mock_server.url());

    let provider = GitlabProvider::new("acme", String::new(), Some(&base_url), true, false)
        .expect("client builds");
    let filters = vec![ScmProviderFilter {
        paths_exist: vec!["charts/app".to_string()],
        ..Default::default()
    }];
    let repos = provider
        .list_repositories(&filters, Some("https"))
        .await
        .expect("listing succeeds");

    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].branch, "main");
    assert_eq!(repos[0].sha, "0000001");
    assert_eq!(repos[0].url, "https://gitlab.com/acme/platform/svc.git");
}

#[tokio::test]
async fn test_gitlab_list_repos_follows_next_page_header() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("SCM-Provider-Generator", "GitLab-API");

    pact_builder.interaction("list group projects, first page", "", |mut i| {
        i.given("group acme has projects svc and web over two pages");
        i.request
            .method("GET")
            .path("/api/v4/groups/acme/projects")
            .query_param("include_subgroups", "false")
            .query_param("per_page", "100");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .header("x-next-page", "2")
            .json_body(json!([gitlab_project(1, "svc")]));
        i
    });
    pact_builder.interaction("list group projects, second page", "", |mut i| {
        i.given("group acme has projects svc and web over two pages");
        i.request
            .method("GET")
            .path("/api/v4/groups/acme/projects")
            .query_param("include_subgroups", "false")
            .query_param("per_page", "100")
            .query_param("page", "2");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([gitlab_project(2, "web")]));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let base_url = mock_base_url(mock_server.url());

    let provider = GitlabProvider::new("acme", String::new(), Some(&base_url), false, false)
        .expect("client builds");
    let repos = provider
        .list_repos(CloneProtocol::Https)
        .await
        .expect("listing succeeds");

    let names: Vec<(&str, Option<&str>)> = repos
        .iter()
        .map(|r| (r.repository.as_str(), r.repository_id.as_deref()))
        .collect();
    assert_eq!(names, vec![("svc", Some("1")), ("web", Some("2"))]);
}

#[tokio::test]
async fn test_gitlab_path_filter_accepts_leading_slash() {
    init_rustls();
    let mut pact_builder = PactBuilder::new("SCM-Provider-Generator", "GitLab-API");

    pact_builder.interaction("list group projects", "", |mut i| {
        i.given("group acme has project svc");
        i.request
            .method("GET")
            .path("/api/v4/groups/acme/projects")
            .query_param("include_subgroups", "false")
            .query_param("per_page", "100");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([gitlab_project(9, "svc")]));
        i
    });
    pact_builder.interaction("get default branch of project 9", "", |mut i| {
        i.given("project 9 has branch main");
        i.request
            .method("GET")
            .path("/api/v4/projects/9/repository/branches/main");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!({ "name": "main", "commit": { "id": "0000009" } }));
        i
    });
    pact_builder.interaction("list charts directory of project 9 on main", "", |mut i| {
        i.given("project 9 has charts/app on main");
        i.request
            .method("GET")
            .path("/api/v4/projects/9/repository/tree")
            .query_param("path", "charts")
            .query_param("ref", "main")
            .query_param("per_page", "100");
        i.response
            .status(200)
            .header("content-type", "application/json")
            .json_body(json!([
                { "id": "a9", "name": "app", "type": "tree", "path": "charts/app" }
            ]));
        i
    });

    let mock_server = pact_builder.start_mock_server(None, None);
    let base_url = mock_base_url(mock_server.url());

    let provider = GitlabProvider::new("acme", String::new(), Some(&base_url), false, false)
        .expect("client builds");
    let filters = vec![ScmProviderFilter {
        paths_exist: vec!["/charts/app".to_string()],
        ..Default::default()
    }];
    let repos = provider
        .list_repositories(&filters, None)
        .await
        .expect("listing succeeds");

    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].sha, "0000009");
}
