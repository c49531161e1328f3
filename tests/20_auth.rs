mod common;

use anyhow::Result;
use reqwest::StatusCode;

use flowboard_api::auth::{generate_jwt, Claims};

// Credential failures must all produce the same envelope, and protected
// routes must reject before touching anything else.

#[tokio::test]
async fn protected_route_without_token_is_unauthenticated() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/api/projects", server.base_url))
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "UNAUTHENTICATED");
    assert_eq!(body["message"], "authentication required");
    Ok(())
}

#[tokio::test]
async fn malformed_bearer_token_is_unauthenticated() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for header in ["Bearer not-a-jwt", "Basic dXNlcjpwYXNz", "Bearer "] {
        let res = client
            .get(format!("{}/api/auth/whoami", server.base_url))
            .header("Authorization", header)
            .send()
            .await?;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "header: {}", header);
        let body = res.json::<serde_json::Value>().await?;
        // Same message regardless of which check failed
        assert_eq!(body["error"], "UNAUTHENTICATED");
        assert_eq!(body["message"], "authentication required");
    }
    Ok(())
}

#[tokio::test]
async fn valid_token_reaches_whoami() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // Test process and server share the same secret configuration
    let id = uuid::Uuid::new_v4();
    let claims = Claims::new(id, "probe@example.com".into(), "user".into());
    let token = generate_jwt(&claims)?;

    let res = client
        .get(format!("{}/api/auth/whoami", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], id.to_string());
    assert_eq!(body["data"]["email"], "probe@example.com");
    Ok(())
}

#[tokio::test]
async fn refresh_returns_new_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let claims = Claims::new(uuid::Uuid::new_v4(), "probe@example.com".into(), "user".into());
    let token = generate_jwt(&claims)?;

    let res = client
        .post(format!("{}/api/auth/refresh", server.base_url))
        .bearer_auth(&token)
        .send()
        .await?;

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["success"], true);
    assert!(body["data"]["token"].is_string());
    assert!(body["data"]["expires_in"].as_i64().unwrap_or(0) > 0);
    Ok(())
}
