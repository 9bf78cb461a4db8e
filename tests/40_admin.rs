mod common;

use anyhow::Result;
use edu_platform_api::auth::Role;
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn admin_lists_registered_jobs() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app.get_as(Role::Admin, "/api/admin/jobs").send().await?;
    assert_eq!(res.status(), StatusCode::OK);

    let body: Value = res.json().await?;
    let names: Vec<&str> = body["data"]
        .as_array()
        .expect("job list")
        .iter()
        .filter_map(|job| job["name"].as_str())
        .collect();
    assert_eq!(
        names,
        vec!["due-soon", "retention", "provider-health", "progress-summary", "quota-reconcile", "attachment-backfill"]
    );
    Ok(())
}

#[tokio::test]
async fn admin_routes_refuse_teachers() -> Result<()> {
    let app = common::spawn_default().await?;

    for path in ["/api/admin/jobs", "/api/admin/dlq", "/api/admin/licenses", "/api/admin/audit-logs"] {
        let res = app.get_as(Role::Teacher, path).send().await?;
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "{}", path);
    }
    Ok(())
}

#[tokio::test]
async fn unknown_job_is_not_found() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app.post_as(Role::Admin, "/api/admin/jobs/no-such-job/run").send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn usage_range_must_be_ordered() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app
        .get_as(Role::Admin, "/api/admin/usage?from=2026-03-10&to=2026-03-01")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app.get_as(Role::Admin, "/api/admin/usage?from=yesterday&to=today").send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn dlq_status_filter_is_validated() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app.get_as(Role::Admin, "/api/admin/dlq?status=lost").send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn rate_limit_returns_429_with_retry_after() -> Result<()> {
    let mut config = common::test_config();
    config.api.enable_rate_limiting = true;
    config.api.rate_limit_requests = 2;
    let app = common::spawn_app(config).await?;
    let token = common::token_for(Role::Admin);

    for _ in 0..2 {
        let res = app.get("/api/admin/jobs").bearer_auth(&token).send().await?;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = app.get("/api/admin/jobs").bearer_auth(&token).send().await?;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers().contains_key("retry-after"));

    let body: Value = res.json().await?;
    assert_eq!(body["error"]["code"], "TOO_MANY_REQUESTS");
    Ok(())
}

#[tokio::test]
async fn expertfolio_is_hidden_when_disabled() -> Result<()> {
    let mut config = common::test_config();
    config.features.expertfolio = false;
    let app = common::spawn_app(config).await?;

    let res = app.get_as(Role::Student, "/api/expertfolio/assessments").send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn parents_cannot_see_expertfolio() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app.get_as(Role::Parent, "/api/expertfolio/assessments").send().await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}
