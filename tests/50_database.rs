//! Runs against the Postgres database named by `DATABASE_URL` and skips
//! itself when the variable is unset.

mod common;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use common::{token_for_user, TestApp};
use edu_platform_api::auth::Role;
use edu_platform_api::services::file_service;

struct Actor {
    id: Uuid,
    token: String,
}

async fn profile(pool: &PgPool, role: Role) -> Result<Actor> {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO profiles (id, email, display_name, role) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(format!("{}@example.com", id))
        .bind(format!("Test {}", role))
        .bind(role.as_str())
        .execute(pool)
        .await?;
    Ok(Actor {
        id,
        token: token_for_user(id, role),
    })
}

async fn course(pool: &PgPool, teacher: &Actor) -> Result<Uuid> {
    let id: Uuid = sqlx::query_scalar("INSERT INTO courses (teacher_id, title) VALUES ($1, 'Biology') RETURNING id")
        .bind(teacher.id)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

async fn enroll(pool: &PgPool, course_id: Uuid, student: &Actor) -> Result<()> {
    sqlx::query("INSERT INTO enrollments (course_id, student_id) VALUES ($1, $2)")
        .bind(course_id)
        .bind(student.id)
        .execute(pool)
        .await?;
    Ok(())
}

async fn assignment(pool: &PgPool, course_id: Uuid, due_in: Option<Duration>) -> Result<Uuid> {
    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO assignments (course_id, title, points, due_at) VALUES ($1, 'Cell diagram', 10, $2) RETURNING id",
    )
    .bind(course_id)
    .bind(due_in.map(|d| Utc::now() + d))
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn used_bytes(pool: &PgPool, owner: &Actor) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT used_bytes FROM storage_quotas WHERE owner_id = $1")
        .bind(owner.id)
        .fetch_one(pool)
        .await?)
}

async fn data(res: reqwest::Response, expected: StatusCode) -> Result<Value> {
    let status = res.status();
    let body: Value = res.json().await?;
    assert_eq!(status, expected, "unexpected response: {}", body);
    Ok(body["data"].clone())
}

fn id_of(value: &Value) -> Result<String> {
    value["id"].as_str().map(str::to_string).context("response without id")
}

async fn request_upload(app: &TestApp, owner: &Actor, name: &str, size: i64) -> Result<reqwest::Response> {
    Ok(app
        .post("/api/files/upload-url")
        .bearer_auth(&owner.token)
        .json(&json!({ "filename": name, "content_type": "text/plain", "size_bytes": size }))
        .send()
        .await?)
}

#[tokio::test]
async fn pending_uploads_hold_quota_until_settled() -> Result<()> {
    let Some(app) = common::spawn_with_database().await? else {
        return Ok(());
    };
    let pool = &app.state.pool;
    let owner = profile(pool, Role::Student).await?;

    // Quota is 1000 bytes; a pending 600 byte upload leaves no room for another
    let first = data(request_upload(&app, &owner, "a.txt", 600).await?, StatusCode::CREATED).await?;
    let res = request_upload(&app, &owner, "b.txt", 600).await?;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(used_bytes(pool, &owner).await?, 600);

    // Storage holds less than declared: the difference is released
    let first_id = id_of(&first["file"])?;
    let key = first["file"]["object_key"].as_str().context("object key")?;
    app.storage.put_object(key, 400).await;
    let done = data(
        app.post(&format!("/api/files/{}/complete", first_id))
            .bearer_auth(&owner.token)
            .send()
            .await?,
        StatusCode::OK,
    )
    .await?;
    assert_eq!(done["size_bytes"], 400);
    assert_eq!(used_bytes(pool, &owner).await?, 400);

    // Storage holds more than declared: refused and still pending
    let second = data(request_upload(&app, &owner, "b.txt", 500).await?, StatusCode::CREATED).await?;
    let second_id = id_of(&second["file"])?;
    let key = second["file"]["object_key"].as_str().context("object key")?;
    app.storage.put_object(key, 700).await;
    let res = app
        .post(&format!("/api/files/{}/complete", second_id))
        .bearer_auth(&owner.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(used_bytes(pool, &owner).await?, 900);

    let res = request_upload(&app, &owner, "c.txt", 200).await?;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

    // Deleting the pending file gives its reservation back
    let res = app
        .client
        .delete(app.url(&format!("/api/files/{}", second_id)))
        .bearer_auth(&owner.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(used_bytes(pool, &owner).await?, 400);
    Ok(())
}

#[tokio::test]
async fn unknown_sizes_are_left_for_the_backfill() -> Result<()> {
    let Some(app) = common::spawn_with_database().await? else {
        return Ok(());
    };
    let pool = &app.state.pool;
    let owner = profile(pool, Role::Student).await?;

    let ticket = data(request_upload(&app, &owner, "notes.txt", 300).await?, StatusCode::CREATED).await?;
    let file_id: Uuid = id_of(&ticket["file"])?.parse()?;

    // Nothing in storage yet, so the size stays unknown and the declared size stays charged
    let done = data(
        app.post(&format!("/api/files/{}/complete", file_id))
            .bearer_auth(&owner.token)
            .send()
            .await?,
        StatusCode::OK,
    )
    .await?;
    assert_eq!(done["status"], "uploaded");
    assert!(done["size_bytes"].is_null());
    assert_eq!(used_bytes(pool, &owner).await?, 300);

    let candidates = file_service::missing_sizes(pool, 10_000).await?;
    assert!(candidates.iter().any(|f| f.id == file_id));

    assert!(file_service::set_size(pool, file_id, 120).await?);
    assert!(!file_service::set_size(pool, file_id, 999).await?);
    assert_eq!(used_bytes(pool, &owner).await?, 120);

    let candidates = file_service::missing_sizes(pool, 10_000).await?;
    assert!(!candidates.iter().any(|f| f.id == file_id));
    Ok(())
}

#[tokio::test]
async fn graded_submissions_cannot_be_replaced() -> Result<()> {
    let Some(app) = common::spawn_with_database().await? else {
        return Ok(());
    };
    let pool = &app.state.pool;
    let teacher = profile(pool, Role::Teacher).await?;
    let student = profile(pool, Role::Student).await?;
    let course_id = course(pool, &teacher).await?;
    enroll(pool, course_id, &student).await?;
    let assignment_id = assignment(pool, course_id, None).await?;
    let path = format!("/api/assignments/{}/submissions", assignment_id);

    let first = data(
        app.post(&path)
            .bearer_auth(&student.token)
            .json(&json!({ "body": "Draft" }))
            .send()
            .await?,
        StatusCode::CREATED,
    )
    .await?;
    let revised = data(
        app.post(&path)
            .bearer_auth(&student.token)
            .json(&json!({ "body": "Final" }))
            .send()
            .await?,
        StatusCode::CREATED,
    )
    .await?;
    assert_eq!(first["id"], revised["id"]);

    let submission_id = id_of(&revised)?;
    let res = app
        .client
        .put(app.url(&format!("/api/submissions/{}/grade", submission_id)))
        .bearer_auth(&teacher.token)
        .json(&json!({ "score": 8.5, "feedback": "Label the nucleus" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .post(&path)
        .bearer_auth(&student.token)
        .json(&json!({ "body": "After grading" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let body: Option<String> = sqlx::query_scalar("SELECT body FROM submissions WHERE id = $1::uuid")
        .bind(&submission_id)
        .fetch_one(pool)
        .await?;
    assert_eq!(body.as_deref(), Some("Final"));
    Ok(())
}

#[tokio::test]
async fn due_soon_reminds_each_student_once() -> Result<()> {
    let Some(app) = common::spawn_with_database().await? else {
        return Ok(());
    };
    let pool = &app.state.pool;
    let teacher = profile(pool, Role::Teacher).await?;
    let waiting = profile(pool, Role::Student).await?;
    let finished = profile(pool, Role::Student).await?;
    let course_id = course(pool, &teacher).await?;
    enroll(pool, course_id, &waiting).await?;
    enroll(pool, course_id, &finished).await?;

    let soon = assignment(pool, course_id, Some(Duration::hours(2))).await?;
    let later = assignment(pool, course_id, Some(Duration::days(5))).await?;
    sqlx::query("INSERT INTO submissions (assignment_id, student_id, body) VALUES ($1, $2, 'done')")
        .bind(soon)
        .bind(finished.id)
        .execute(pool)
        .await?;

    app.state.jobs.run_once("due-soon").await?;
    app.state.jobs.run_once("due-soon").await?;

    let reminders = |student: Uuid, assignment: Uuid| {
        sqlx::query_scalar::<_, i64>(
            "SELECT count(*) FROM notifications
             WHERE user_id = $1 AND kind = 'due_soon' AND payload->>'assignment_id' = $2::text",
        )
        .bind(student)
        .bind(assignment)
        .fetch_one(pool)
    };
    assert_eq!(reminders(waiting.id, soon).await?, 1);
    assert_eq!(reminders(finished.id, soon).await?, 0);
    assert_eq!(reminders(waiting.id, later).await?, 0);
    Ok(())
}

#[tokio::test]
async fn quiz_attempts_reuse_open_attempt_and_stop_at_max() -> Result<()> {
    let Some(app) = common::spawn_with_database().await? else {
        return Ok(());
    };
    let pool = &app.state.pool;
    let teacher = profile(pool, Role::Teacher).await?;
    let student = profile(pool, Role::Student).await?;
    let course_id = course(pool, &teacher).await?;
    enroll(pool, course_id, &student).await?;

    let quiz = data(
        app.post(&format!("/api/courses/{}/quizzes", course_id))
            .bearer_auth(&teacher.token)
            .json(&json!({ "title": "Cells", "max_attempts": 1 }))
            .send()
            .await?,
        StatusCode::CREATED,
    )
    .await?;
    let quiz_id = id_of(&quiz)?;
    data(
        app.post(&format!("/api/quizzes/{}/questions", quiz_id))
            .bearer_auth(&teacher.token)
            .json(&json!({ "prompt": "Powerhouse of the cell?", "choices": ["Nucleus", "Mitochondria"], "correct_index": 1, "points": 2 }))
            .send()
            .await?,
        StatusCode::CREATED,
    )
    .await?;
    data(
        app.post(&format!("/api/quizzes/{}/publish", quiz_id))
            .bearer_auth(&teacher.token)
            .send()
            .await?,
        StatusCode::OK,
    )
    .await?;

    let attempts = format!("/api/quizzes/{}/attempts", quiz_id);
    let started = data(app.post(&attempts).bearer_auth(&student.token).send().await?, StatusCode::CREATED).await?;
    let reopened = data(app.post(&attempts).bearer_auth(&student.token).send().await?, StatusCode::OK).await?;
    assert_eq!(started["id"], reopened["id"]);

    let scored = data(
        app.post(&format!("/api/attempts/{}/submit", id_of(&started)?))
            .bearer_auth(&student.token)
            .json(&json!({ "answers": [1] }))
            .send()
            .await?,
        StatusCode::OK,
    )
    .await?;
    assert_eq!(scored["score"], 2.0);

    let res = app.post(&attempts).bearer_auth(&student.token).send().await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn scheduled_announcements_stay_hidden_from_families() -> Result<()> {
    let Some(app) = common::spawn_with_database().await? else {
        return Ok(());
    };
    let pool = &app.state.pool;
    let teacher = profile(pool, Role::Teacher).await?;
    let student = profile(pool, Role::Student).await?;
    let parent = profile(pool, Role::Parent).await?;
    let course_id = course(pool, &teacher).await?;
    enroll(pool, course_id, &student).await?;
    sqlx::query("INSERT INTO parent_links (parent_id, student_id) VALUES ($1, $2)")
        .bind(parent.id)
        .bind(student.id)
        .execute(pool)
        .await?;

    let path = format!("/api/courses/{}/announcements", course_id);
    data(
        app.post(&path)
            .bearer_auth(&teacher.token)
            .json(&json!({ "title": "Lab today", "body": "Bring goggles" }))
            .send()
            .await?,
        StatusCode::CREATED,
    )
    .await?;
    let scheduled = data(
        app.post(&path)
            .bearer_auth(&teacher.token)
            .json(&json!({ "title": "Exam moved", "body": "Next week", "publish_at": Utc::now() + Duration::days(2) }))
            .send()
            .await?,
        StatusCode::CREATED,
    )
    .await?;

    let titles = |listing: Value| -> Vec<String> {
        listing
            .as_array()
            .map(|items| items.iter().filter_map(|a| a["title"].as_str().map(str::to_string)).collect())
            .unwrap_or_default()
    };
    for actor in [&student, &parent] {
        let listing = data(app.get(&path).bearer_auth(&actor.token).send().await?, StatusCode::OK).await?;
        assert_eq!(titles(listing), vec!["Lab today".to_string()]);
    }
    let listing = data(app.get(&path).bearer_auth(&teacher.token).send().await?, StatusCode::OK).await?;
    assert_eq!(titles(listing).len(), 2);

    // Deleting is audited
    let scheduled_id = id_of(&scheduled)?;
    let res = app
        .client
        .delete(app.url(&format!("/api/announcements/{}", scheduled_id)))
        .bearer_auth(&teacher.token)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let audited: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM audit_logs WHERE action = 'announcement.delete' AND entity_id = $1 AND actor_id = $2",
    )
    .bind(&scheduled_id)
    .bind(teacher.id)
    .fetch_one(pool)
    .await?;
    assert_eq!(audited, 1);
    Ok(())
}
