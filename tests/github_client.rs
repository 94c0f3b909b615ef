// tests/github_client.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ci_auto::errors::CiError;
use ci_auto::remote::{GitHubClient, RemoteService};

type TestResult = Result<(), Box<dyn Error>>;

fn pull(number: u64, labels: &[&str]) -> serde_json::Value {
    json!({
        "number": number,
        "id": 5000 + number,
        "labels": labels.iter().map(|l| json!({"name": l})).collect::<Vec<_>>(),
        "head": {
            "ref": "feature/x",
            "sha": "abc123",
            "user": {"login": "alice"},
            "repo": {"name": "regional_workflow", "full_name": "alice/regional_workflow"}
        }
    })
}

#[tokio::test]
async fn lists_open_requests_oldest_first_for_base() -> TestResult {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/ufs-community/regional_workflow/pulls"))
        .and(query_param("state", "open"))
        .and(query_param("sort", "created"))
        .and(query_param("base", "develop"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            pull(1, &["ci-hera-intel-build"]),
            pull(2, &[])
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = GitHubClient::new(&server.uri(), "tok")?;
    let requests = client
        .list_open_requests("ufs-community/regional_workflow", "develop")
        .await?;

    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].number, 1);
    assert_eq!(requests[0].id, 5001);
    assert_eq!(requests[0].repo, "ufs-community/regional_workflow");
    assert_eq!(requests[0].labels, vec!["ci-hera-intel-build".to_string()]);
    assert_eq!(requests[0].head.repo_full_name, "alice/regional_workflow");
    assert_eq!(requests[0].head.branch, "feature/x");
    assert_eq!(requests[0].head.user_login, "alice");
    Ok(())
}

#[tokio::test]
async fn removes_label_and_round_trips_comments() -> TestResult {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/repos/o/r/issues/7/labels/ci-hera-intel-build"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/o/r/issues/7/comments"))
        .and(body_json(json!({"body": "Build was Successful\n"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 4242, "body": "Build was Successful\n"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/issues/comments/4242"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 4242, "body": "Build was Successful\n"})))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/repos/o/r/issues/comments/4242"))
        .and(body_json(json!({"body": "Build was Successful\nAll experiments completed\n"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 4242})))
        .expect(1)
        .mount(&server)
        .await;

    let client = GitHubClient::new(&server.uri(), "tok")?;
    client.remove_label("o/r", 7, "ci-hera-intel-build").await?;
    let id = client.create_comment("o/r", 7, "Build was Successful\n").await?;
    assert_eq!(id, 4242);

    let mut body = client.get_comment("o/r", id).await?;
    body.push_str("All experiments completed\n");
    client.edit_comment("o/r", id, &body).await?;
    Ok(())
}

#[tokio::test]
async fn branches_are_paginated() -> TestResult {
    init_tracing();
    let server = MockServer::start().await;
    let first: Vec<_> = (0..100).map(|i| json!({"name": format!("b{i}")})).collect();
    Mock::given(method("GET"))
        .and(path("/repos/alice/ufs-srweather-app/branches"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/alice/ufs-srweather-app/branches"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "feature/x"}])))
        .mount(&server)
        .await;

    let client = GitHubClient::new(&server.uri(), "tok")?;
    let branches = client.list_branches("alice/ufs-srweather-app").await?;
    assert_eq!(branches.len(), 101);
    assert_eq!(branches.last().map(String::as_str), Some("feature/x"));
    Ok(())
}

#[tokio::test]
async fn error_status_becomes_remote_error() -> TestResult {
    init_tracing();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/o/r/issues/7/labels"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let client = GitHubClient::new(&server.uri(), "tok")?;
    match client.list_labels("o/r", 7).await {
        Err(CiError::RemoteError { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Not Found");
        }
        other => panic!("expected RemoteError, got {other:?}"),
    }
    Ok(())
}
