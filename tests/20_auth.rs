mod common;

use anyhow::Result;
use edu_platform_api::auth::{generate_jwt, Claims, Role};
use reqwest::StatusCode;
use serde_json::Value;
use uuid::Uuid;

#[tokio::test]
async fn missing_token_is_unauthorized() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app.get("/api/courses").send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(body["request_id"].is_string());
    Ok(())
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() -> Result<()> {
    let app = common::spawn_default().await?;
    let claims = Claims::new(Uuid::new_v4(), "x@example.com", Role::Admin, 1);
    let forged = generate_jwt(&claims, "some-other-secret")?;

    let res = app.get("/api/admin/jobs").bearer_auth(forged).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn non_bearer_scheme_is_rejected() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app
        .get("/api/courses")
        .header("authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn database_outage_surfaces_as_503() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app.get_as(Role::Student, "/api/auth/whoami").send().await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = res.json().await?;
    assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
    Ok(())
}
