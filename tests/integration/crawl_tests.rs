//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the GitHub API and run the full
//! crawl cycle end-to-end against a temporary SQLite database.

use repo_harvest::config::{parse_config, Config};
use repo_harvest::crawler::run_crawl;
use repo_harvest::state::KeywordType;
use repo_harvest::storage::{RunStatus, SqliteStorage, Storage};
use repo_harvest::HarvestError;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";
const ROOT_QUERY: &str = "com.unity.xr size:0..100 filename:manifest.json";

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, db_path: &Path) -> Config {
    let toml = format!(
        r#"
[api]
base-url = "{}"
user-agent = "repo-harvest-tests"
cooldown-secs = 1

[search]
domain-from = 0
domain-to = 100

[output]
database-path = "{}"
"#,
        base_url,
        db_path.display()
    );
    parse_config(&toml).expect("test config is valid")
}

fn repository_json(id: i64, name: &str, pushed_at: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "owner": { "login": "octo" },
        "description": "Mixed reality toolkit sample",
        "license": { "name": "MIT License" },
        "created_at": "2020-01-01T00:00:00Z",
        "updated_at": "2021-01-01T00:00:00Z",
        "pushed_at": pushed_at,
        "stargazers_count": 5,
        "watchers_count": 5,
        "forks_count": 1,
        "open_issues_count": 0,
        "has_issues": true,
        "has_downloads": true,
        "has_wiki": false,
        "has_pages": false
    })
}

fn search_json(total_count: u64, repositories: &[(i64, &str)]) -> Value {
    let items: Vec<Value> = repositories
        .iter()
        .map(|(id, name)| {
            json!({
                "name": "manifest.json",
                "path": "Packages/manifest.json",
                "repository": { "id": id, "full_name": format!("octo/{}", name) }
            })
        })
        .collect();
    json!({ "total_count": total_count, "incomplete_results": false, "items": items })
}

fn tree_json(paths: &[&str]) -> Value {
    let tree: Vec<Value> = paths
        .iter()
        .map(|p| json!({ "path": p, "type": "blob" }))
        .collect();
    json!({ "sha": "HEAD", "tree": tree, "truncated": false })
}

/// Mounts a generous rate limit that requires the test token
async fn mount_rate_limit(server: &MockServer) {
    let reset = chrono::Utc::now().timestamp() + 3600;
    Mock::given(method("GET"))
        .and(path("/rate_limit"))
        .and(header("authorization", format!("token {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resources": {
                "core": { "limit": 5000, "remaining": 5000, "reset": reset },
                "search": { "limit": 30, "remaining": 30, "reset": reset }
            }
        })))
        .mount(server)
        .await;
}

/// Mounts a two-page code search result for `query`
async fn mount_search(server: &MockServer, query: &str, repositories: &[(i64, &str)]) {
    Mock::given(method("GET"))
        .and(path("/search/code"))
        .and(query_param("q", query))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(search_json(repositories.len() as u64, repositories)),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search/code"))
        .and(query_param("q", query))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(search_json(repositories.len() as u64, &[])),
        )
        .mount(server)
        .await;
}

async fn mount_repository(
    server: &MockServer,
    id: i64,
    name: &str,
    pushed_at: &str,
    readme: Option<&str>,
    paths: &[&str],
) {
    Mock::given(method("GET"))
        .and(path(format!("/repositories/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(repository_json(id, name, pushed_at)))
        .mount(server)
        .await;

    let readme_response = match readme {
        Some(text) => ResponseTemplate::new(200).set_body_string(text),
        None => ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })),
    };
    Mock::given(method("GET"))
        .and(path(format!("/repositories/{}/readme", id)))
        .respond_with(readme_response)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/repositories/{}/git/trees/HEAD", id)))
        .and(query_param("recursive", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tree_json(paths)))
        .mount(server)
        .await;
}

/// Serves a full first crawl of two repositories
async fn start_two_repository_server() -> MockServer {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    mount_search(&server, ROOT_QUERY, &[(1, "vr-one"), (2, "vr-two")]).await;
    mount_repository(
        &server,
        1,
        "vr-one",
        "2021-06-01T12:00:00Z",
        Some("# VR One\n<p>Hand tracking for the Oculus Quest.</p> Docs at https://example.com/vr-one"),
        &["Assets/Scripts/HandTracker.cs", "Assets/Scripts/Shared.cs", "Packages/manifest.json"],
    )
    .await;
    mount_repository(
        &server,
        2,
        "vr-two",
        "2021-06-02T12:00:00Z",
        None,
        &["Assets/Teleporter.cs", "Assets/Only Two.cs"],
    )
    .await;
    server
}

fn open_db(dir: &TempDir) -> SqliteStorage {
    SqliteStorage::new(&dir.path().join("harvest.db")).expect("database opens")
}

#[tokio::test]
async fn test_full_crawl_indexes_repositories() {
    let server = start_two_repository_server().await;
    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &dir.path().join("harvest.db"));

    let summary = run_crawl(&config, Some(TOKEN), "hash-1", None)
        .await
        .expect("crawl succeeds");
    assert_eq!(summary.repositories_visited, 2);
    assert_eq!(summary.repositories_removed, 0);

    let storage = open_db(&dir);
    assert_eq!(storage.stored_repository_ids().unwrap(), vec![1, 2]);

    let repo = storage.get_repository(1).unwrap().unwrap();
    assert_eq!(repo.full_name(), "octo/vr-one");
    assert_eq!(repo.license.as_deref(), Some("MIT License"));

    let edges = storage.edges_for_repository(1).unwrap();
    let classnames: Vec<&str> = edges
        .iter()
        .filter(|e| e.kind == KeywordType::Classname)
        .map(|e| e.word.as_str())
        .collect();
    assert_eq!(classnames, vec!["handtracker", "shared"]);
    assert!(edges
        .iter()
        .any(|e| e.kind == KeywordType::ReadmeRake2 && e.word == "hand tracking"));
    assert!(!edges.iter().any(|e| e.word.contains("example")));

    // No README: only classnames
    let edges = storage.edges_for_repository(2).unwrap();
    assert!(edges.iter().all(|e| e.kind == KeywordType::Classname));
    assert_eq!(edges.len(), 2);

    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "hash-1");
    assert_eq!(run.repositories_visited, 2);
}

#[tokio::test]
async fn test_recrawl_skips_unchanged_and_removes_vanished() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("harvest.db");

    {
        let server = start_two_repository_server().await;
        let config = create_test_config(&server.uri(), &db_path);
        run_crawl(&config, Some(TOKEN), "hash-1", None)
            .await
            .expect("first crawl succeeds");
    }
    let keywords_before = open_db(&dir).count_keywords().unwrap();

    // Second run: repository 2 no longer matches, repository 1 was not pushed
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    mount_search(&server, ROOT_QUERY, &[(1, "vr-one")]).await;
    Mock::given(method("GET"))
        .and(path("/repositories/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(repository_json(1, "vr-one", "2021-06-01T12:00:00Z")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repositories/1/readme"))
        .respond_with(ResponseTemplate::new(200).set_body_string("unused"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repositories/1/git/trees/HEAD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(tree_json(&[])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/code"))
        .and(query_param(
            "q",
            "com.unity.xr filename:manifest.json repo:octo/vr-two",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_json(0, &[])))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), &db_path);
    let summary = run_crawl(&config, Some(TOKEN), "hash-2", None)
        .await
        .expect("second crawl succeeds");
    assert_eq!(summary.repositories_visited, 1);
    assert_eq!(summary.repositories_removed, 1);
    // "teleporter" and "only two" belonged to repository 2 alone
    assert_eq!(summary.keywords_removed, 2);

    let storage = open_db(&dir);
    assert_eq!(storage.stored_repository_ids().unwrap(), vec![1]);
    assert!(storage.edges_for_repository(2).unwrap().is_empty());
    assert_eq!(storage.count_keywords().unwrap(), keywords_before - 2);

    server.verify().await;
}

#[tokio::test]
async fn test_rate_limited_call_is_retried_once() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    mount_search(&server, ROOT_QUERY, &[(1, "vr-one")]).await;

    // First metadata request is throttled; the retry succeeds
    Mock::given(method("GET"))
        .and(path("/repositories/1"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_repository(&server, 1, "vr-one", "2021-06-01T12:00:00Z", None, &[]).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &dir.path().join("harvest.db"));
    let summary = run_crawl(&config, Some(TOKEN), "hash", None)
        .await
        .expect("retry recovers");
    assert_eq!(summary.repositories_visited, 1);
    assert_eq!(open_db(&dir).count_repositories().unwrap(), 1);
}

#[tokio::test]
async fn test_second_failure_aborts_crawl() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    mount_search(&server, ROOT_QUERY, &[(1, "vr-one")]).await;
    Mock::given(method("GET"))
        .and(path("/repositories/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(2)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &dir.path().join("harvest.db"));
    let result = run_crawl(&config, Some(TOKEN), "hash", None).await;
    assert!(matches!(result, Err(HarvestError::Api(_))));

    let storage = open_db(&dir);
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error_message.is_some());
    assert_eq!(storage.count_repositories().unwrap(), 0);

    server.verify().await;
}

#[tokio::test]
async fn test_domain_override() {
    let server = MockServer::start().await;
    mount_rate_limit(&server).await;
    Mock::given(method("GET"))
        .and(path("/search/code"))
        .and(query_param("q", "com.unity.xr size:40..60 filename:manifest.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_json(0, &[])))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server.uri(), &dir.path().join("harvest.db"));
    let summary = run_crawl(&config, Some(TOKEN), "hash", Some((40, 60)))
        .await
        .expect("empty crawl succeeds");
    assert_eq!(summary.repositories_visited, 0);

    server.verify().await;
}
