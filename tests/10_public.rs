mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/health")).await?;

    // OK with a database, SERVICE_UNAVAILABLE without one
    assert!(
        res.status() == StatusCode::OK || res.status() == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status: {}",
        res.status()
    );
    let body = res.json::<serde_json::Value>().await?;
    assert!(body["data"]["status"].is_string(), "{}", body);
    Ok(())
}

#[tokio::test]
async fn index_lists_endpoints() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::get(server.url("/")).await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Flock API");
    assert!(body["data"]["endpoints"]["cell_groups"].is_string());
    Ok(())
}

#[tokio::test]
async fn login_to_unknown_tenant_fails() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .post(server.url("/auth/login/no-such-church/nobody"))
        .json(&json!({ "password": "whatever-123" }))
        .send()
        .await?;

    // NOT_FOUND with a registry; a 5xx when no database is reachable
    assert!(
        matches!(
            res.status(),
            StatusCode::NOT_FOUND | StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE
        ),
        "unexpected status: {}",
        res.status()
    );
    let body = res.json::<serde_json::Value>().await?;
    common::assert_error_envelope(&body);
    Ok(())
}

#[tokio::test]
async fn refresh_rejects_forged_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let res = reqwest::Client::new()
        .post(server.url("/auth/refresh"))
        .json(&json!({ "token": "not.a.jwt" }))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(common::assert_error_envelope(&body), "UNAUTHORIZED");
    Ok(())
}
