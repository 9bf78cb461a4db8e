use axum::extract::State;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{PageQuery, Validator};
use crate::auth::Role;
use crate::database::models::{Assignment, Course, Submission};
use crate::error::ApiError;
use crate::middleware::{ApiJson, ApiPath, ApiQuery, ApiResponse, ApiResult, AuthUser};
use crate::services::access::{visible_course, CourseRole};
use crate::services::{course_service, file_service, parent_service, submission_service};
use crate::state::AppState;

use super::assignments::load_assignment;

#[derive(Debug, Deserialize)]
pub struct CreateSubmission {
    pub body: Option<String>,
    pub file_id: Option<Uuid>,
}

/// A submission together with where it lives, once the caller is known to
/// be allowed to see it
pub(super) struct SubmissionContext {
    pub submission: Submission,
    pub assignment: Assignment,
    pub course: Course,
}

impl SubmissionContext {
    pub fn can_grade(&self, user: &AuthUser) -> bool {
        user.is_admin() || (user.role == Role::Teacher && self.course.teacher_id == user.id)
    }
}

/// Owning student, course teacher, linked parent or admin; anyone else gets 404
pub(super) async fn visible_submission(state: &AppState, user: &AuthUser, id: Uuid) -> Result<SubmissionContext, ApiError> {
    let not_found = || ApiError::not_found("Submission not found");

    let submission = submission_service::get(&state.pool, id).await?.ok_or_else(not_found)?;
    let assignment = load_assignment(state, submission.assignment_id).await?;
    let course = course_service::get(&state.pool, assignment.course_id)
        .await?
        .ok_or_else(not_found)?;

    let allowed = match user.role {
        Role::Admin => true,
        Role::Teacher => course.teacher_id == user.id,
        Role::Student => submission.student_id == user.id,
        Role::Parent => parent_service::is_linked(&state.pool, user.id, submission.student_id).await?,
    };
    if !allowed {
        return Err(not_found());
    }

    Ok(SubmissionContext {
        submission,
        assignment,
        course,
    })
}

/// POST /api/assignments/:id/submissions - create or replace the caller's submission
pub async fn submission_create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(assignment_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CreateSubmission>,
) -> ApiResult<Submission> {
    user.require_role(&[Role::Student])?;
    state.rate_limit("submissions:write", &user)?;
    Validator::new()
        .optional_text("body", body.body.as_deref(), submission_service::MAX_BODY_CHARS)
        .check(
            "body",
            submission_service::has_content(body.body.as_deref(), body.file_id),
            "provide a body or a file_id",
        )
        .finish()?;

    let assignment = load_assignment(&state, assignment_id).await?;
    let (_, role) = visible_course(&state.pool, &user, assignment.course_id).await?;
    if role != CourseRole::Student {
        return Err(ApiError::forbidden("Only enrolled students can submit"));
    }

    if let Some(file_id) = body.file_id {
        let file = file_service::get(&state.pool, file_id).await?;
        if !file.is_some_and(|f| f.owner_id == user.id && f.status == "uploaded") {
            return Err(ApiError::invalid_field("file_id", "must reference one of your uploaded files"));
        }
    }

    let submission =
        submission_service::upsert(&state.pool, assignment_id, user.id, body.body.as_deref(), body.file_id).await?;
    tracing::info!("Student {} submitted assignment {}", user.id, assignment_id);
    Ok(ApiResponse::created(submission))
}

/// GET /api/assignments/:id/submissions - everything for the course teacher,
/// only their own for students
pub async fn submission_list(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(assignment_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<Vec<Submission>> {
    state.rate_limit("submissions:read", &user)?;

    let assignment = load_assignment(&state, assignment_id).await?;
    let (_, role) = visible_course(&state.pool, &user, assignment.course_id).await?;
    let student = match role {
        CourseRole::Admin | CourseRole::Owner => None,
        CourseRole::Student => Some(user.id),
        CourseRole::Parent => return Err(ApiError::forbidden("Parents can view grades from /api/parent")),
    };

    let submissions = submission_service::list(&state.pool, assignment_id, student, state.page(&query)).await?;
    Ok(ApiResponse::success(submissions))
}

/// GET /api/submissions/:id
pub async fn submission_get(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Submission> {
    state.rate_limit("submissions:read", &user)?;
    let ctx = visible_submission(&state, &user, id).await?;
    Ok(ApiResponse::success(ctx.submission))
}
