mod common;

use anyhow::Result;
use reqwest::StatusCode;

#[tokio::test]
async fn api_requires_bearer_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for path in ["/api/members", "/api/cell-groups", "/api/auth/whoami", "/api/root/tenants"] {
        let res = client.get(server.url(path)).send().await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{}", path);
        let body = res.json::<serde_json::Value>().await?;
        assert_eq!(common::assert_error_envelope(&body), "UNAUTHORIZED");
    }
    Ok(())
}

#[tokio::test]
async fn api_rejects_malformed_authorization() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(server.url("/api/members"))
        .header("Authorization", "Token abc")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(server.url("/api/members"))
        .bearer_auth("eyJhbGciOiJIUzI1NiJ9.e30.invalid")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
