//! GitHub client behaviour against a mock server.
//!
//! Covers:
//! 1. `Link` header pagination across several pages
//! 2. 401 short-circuiting an aggregation before any repository call
//! 3. Search result objects (`items`) and the mentions query
//! 4. Rate-limit and non-JSON error mapping
//! 5. A failing later page and off-host `next` links

use gitping_lib::error::AppError;
use gitping_lib::models::Organization;
use gitping_lib::services::{AggregateOptions, Aggregator, GitHubClient, GitHubClientConfig};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> GitHubClient {
    GitHubClient::new(GitHubClientConfig {
        base_url: server.uri(),
        token: "test-token".into(),
        timeout_secs: 5,
    })
    .unwrap()
}

fn orgs(logins: &[&str]) -> serde_json::Value {
    json!(logins
        .iter()
        .map(|login| json!({ "login": login }))
        .collect::<Vec<_>>())
}

#[tokio::test]
async fn test_pagination_follows_link_header() {
    let server = MockServer::start().await;
    let page_url = |page: u32| format!("{}/user/orgs?per_page=100&page={}", server.uri(), page);

    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .and(query_param_is_missing("page"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "link",
                    format!(
                        "<{}>; rel=\"next\", <{}>; rel=\"last\"",
                        page_url(2),
                        page_url(3)
                    )
                    .as_str(),
                )
                .set_body_json(orgs(&["a", "b"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "link",
                    format!(
                        "<{}>; rel=\"prev\", <{}>; rel=\"next\"",
                        page_url(1),
                        page_url(3)
                    )
                    .as_str(),
                )
                .set_body_json(orgs(&["c", "d"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(orgs(&["e", "f"])))
        .expect(1)
        .mount(&server)
        .await;

    let result: Vec<Organization> = client(&server).list_organizations().await.unwrap();
    let logins: Vec<&str> = result.iter().map(|o| o.login.as_str()).collect();
    assert_eq!(logins, vec!["a", "b", "c", "d", "e", "f"]);
}

#[tokio::test]
async fn test_failing_later_page_discards_earlier_pages() {
    let server = MockServer::start().await;
    let next = format!("{}/user/orgs?per_page=100&page=2", server.uri());

    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .and(query_param_is_missing("page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", format!("<{}>; rel=\"next\"", next).as_str())
                .set_body_json(orgs(&["a", "b"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "Server Error" })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).list_organizations().await;
    match result {
        Err(AppError::GitHubApi {
            status_code: Some(500),
            endpoint,
            ..
        }) => assert_eq!(endpoint.as_deref(), Some("/user/orgs")),
        other => panic!("expected a 500 error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_next_link_to_another_host_is_not_followed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "link",
                    "<https://elsewhere.example/user/orgs?page=2>; rel=\"next\"",
                )
                .set_body_json(orgs(&["a"])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).list_organizations().await.unwrap_err();
    assert!(matches!(err, AppError::DataShape { .. }));
    assert!(err.to_string().contains("outside the API host"));
}

#[tokio::test]
async fn test_single_page_without_link_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/teams"))
        .and(query_param("per_page", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "slug": "core" },
            { "slug": "missing-id" },
            { "id": 2 }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let teams = client(&server).list_teams().await.unwrap();
    assert_eq!(teams.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2]);
}

#[tokio::test]
async fn test_unauthorized_aborts_before_repository_calls() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Bad credentials",
            "documentation_url": "https://docs.github.com/rest"
        })))
        .expect(1)
        .mount(&server)
        .await;

    for endpoint in ["/user/teams", "/user/repos", "/search/issues"] {
        Mock::given(method("GET"))
            .and(path(endpoint))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;
    }

    let client = client(&server);
    let err = Aggregator::new(&client)
        .aggregate("octocat", &AggregateOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_authentication());
    assert_eq!(err.to_string(), "Authentication error: Bad credentials");
}

#[tokio::test]
async fn test_search_mentions_reads_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/issues"))
        .and(query_param("q", "mentions:octocat is:open"))
        .and(query_param("sort", "updated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "incomplete_results": false,
            "items": [
                {
                    "id": 11,
                    "number": 3,
                    "title": "Ping @octocat",
                    "user": { "login": "bob" },
                    "state": "open",
                    "repository_url": "https://api.github.com/repos/acme/api",
                    "html_url": "https://github.com/acme/api/issues/3",
                    "created_at": "2024-04-01T10:00:00Z",
                    "updated_at": "2024-04-02T10:00:00Z"
                },
                { "id": "not-a-number" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mentions = client(&server)
        .search_mentions("octocat", None)
        .await
        .unwrap();
    assert_eq!(mentions.len(), 1);
    assert_eq!(mentions[0].repository_name(), "acme/api");
}

#[tokio::test]
async fn test_rate_limit_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/teams"))
        .respond_with(
            ResponseTemplate::new(403)
                .insert_header("x-ratelimit-remaining", "0")
                .set_body_json(json!({ "message": "API rate limit exceeded for user" })),
        )
        .mount(&server)
        .await;

    match client(&server).list_teams().await.unwrap_err() {
        AppError::GitHubApi {
            message,
            status_code,
            endpoint,
        } => {
            assert_eq!(message, "Rate limit exceeded");
            assert_eq!(status_code, Some(403));
            assert_eq!(endpoint.as_deref(), Some("/user/teams"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_unexpected_body_shape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "orgs": [] })))
        .mount(&server)
        .await;

    let err = client(&server).list_organizations().await.unwrap_err();
    assert!(matches!(err, AppError::DataShape { .. }));
}
