mod common;

use anyhow::Result;
use edu_platform_api::auth::Role;
use reqwest::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

#[tokio::test]
async fn students_cannot_create_courses() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app
        .post_as(Role::Student, "/api/courses")
        .json(&json!({ "title": "Algebra" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let body: Value = res.json().await?;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
    Ok(())
}

#[tokio::test]
async fn empty_course_title_reports_field_error() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app
        .post_as(Role::Teacher, "/api/courses")
        .json(&json!({ "title": "   " }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field_errors"]["title"], "must not be empty");
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_rejected() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app
        .post_as(Role::Teacher, "/api/courses")
        .header("content-type", "application/json")
        .body("{\"title\": ")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    assert_eq!(body["error"]["code"], "INVALID_JSON");
    Ok(())
}

#[tokio::test]
async fn malformed_path_id_is_bad_request() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app.get_as(Role::Teacher, "/api/courses/not-a-uuid").send().await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn quiz_limits_are_checked_before_access() -> Result<()> {
    let app = common::spawn_default().await?;
    let course = Uuid::new_v4();

    let res = app
        .post_as(Role::Teacher, &format!("/api/courses/{}/quizzes", course))
        .json(&json!({ "title": "Week 1", "time_limit_secs": 10, "max_attempts": 50 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    let fields = &body["error"]["field_errors"];
    assert!(fields["time_limit_secs"].is_string());
    assert!(fields["max_attempts"].is_string());
    Ok(())
}

#[tokio::test]
async fn question_needs_valid_correct_index() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app
        .post_as(Role::Teacher, &format!("/api/quizzes/{}/questions", Uuid::new_v4()))
        .json(&json!({ "prompt": "2 + 2?", "choices": ["3", "4"], "correct_index": 2, "points": 1 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    assert!(body["error"]["field_errors"]["correct_index"].is_string());
    Ok(())
}

#[tokio::test]
async fn cannot_message_yourself() -> Result<()> {
    let app = common::spawn_default().await?;
    let me = Uuid::new_v4();

    let res = app
        .post("/api/messages")
        .bearer_auth(common::token_for_user(me, Role::Student))
        .json(&json!({ "recipient_id": me, "subject": "hi", "body": "hello" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    assert!(body["error"]["field_errors"]["recipient_id"].is_string());
    Ok(())
}

#[tokio::test]
async fn upload_rejects_path_separators_and_unknown_types() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app
        .post_as(Role::Student, "/api/files/upload-url")
        .json(&json!({ "filename": "../etc/passwd", "content_type": "application/x-msdownload", "size_bytes": 10 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    let fields = &body["error"]["field_errors"];
    assert!(fields["filename"].is_string());
    assert!(fields["content_type"].is_string());
    Ok(())
}

#[tokio::test]
async fn registry_versions_must_be_semver() -> Result<()> {
    let app = common::spawn_default().await?;

    let res = app
        .post_as(Role::Teacher, &format!("/api/registry/courses/{}/versions", Uuid::new_v4()))
        .json(&json!({ "version": "v1", "manifest": [] }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let body: Value = res.json().await?;
    let fields = &body["error"]["field_errors"];
    assert!(fields["version"].is_string());
    assert!(fields["manifest"].is_string());
    Ok(())
}
