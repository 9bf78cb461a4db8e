mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn root_lists_endpoints() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app.get("/").send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], true);
    assert!(body["data"]["endpoints"].is_object());
    assert!(body["request_id"].is_string());
    Ok(())
}

#[tokio::test]
async fn health_reports_degraded_database() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app.get("/health").send().await?;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = res.json().await?;
    assert_eq!(body["success"], false);
    assert!(body["request_id"].is_string());
    Ok(())
}

#[tokio::test]
async fn request_id_is_echoed_in_header_and_body() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app.get("/").header("x-request-id", "trace-abc-123").send().await?;
    assert_eq!(res.headers()["x-request-id"], "trace-abc-123");

    let body: Value = res.json().await?;
    assert_eq!(body["request_id"], "trace-abc-123");
    Ok(())
}

#[tokio::test]
async fn malformed_request_id_is_replaced() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app.get("/").header("x-request-id", "not ok!").send().await?;
    let header = res.headers()["x-request-id"].to_str()?.to_string();
    assert_ne!(header, "not ok!");
    assert!(uuid::Uuid::parse_str(&header).is_ok());
    Ok(())
}
