//! Course-scoped authorization shared by the handlers.
//!
//! Courses a caller cannot see at all are reported as 404 so their
//! existence is not leaked; visible-but-not-managed courses give 403.

use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::Role;
use crate::database::models::Course;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::services::course_service;

/// How the caller relates to a course
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CourseRole {
    Admin,
    Owner,
    Student,
    Parent,
}

impl CourseRole {
    pub fn can_manage(&self) -> bool {
        matches!(self, CourseRole::Admin | CourseRole::Owner)
    }
}

pub async fn course_role(pool: &PgPool, user: &AuthUser, course: &Course) -> Result<Option<CourseRole>, ApiError> {
    let role = match user.role {
        Role::Admin => Some(CourseRole::Admin),
        Role::Teacher if course.teacher_id == user.id => Some(CourseRole::Owner),
        Role::Teacher => None,
        Role::Student => course_service::is_enrolled(pool, course.id, user.id)
            .await?
            .then_some(CourseRole::Student),
        Role::Parent => course_service::has_enrolled_child(pool, course.id, user.id)
            .await?
            .then_some(CourseRole::Parent),
    };
    Ok(role)
}

/// Load a course the caller can see
pub async fn visible_course(pool: &PgPool, user: &AuthUser, course_id: Uuid) -> Result<(Course, CourseRole), ApiError> {
    let course = course_service::get(pool, course_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;

    match course_role(pool, user, &course).await? {
        Some(role) => Ok((course, role)),
        None => Err(ApiError::not_found("Course not found")),
    }
}

/// Load a course the caller owns (or any course, for admins)
pub async fn managed_course(pool: &PgPool, user: &AuthUser, course_id: Uuid) -> Result<Course, ApiError> {
    let (course, role) = visible_course(pool, user, course_id).await?;
    if role.can_manage() {
        Ok(course)
    } else {
        Err(ApiError::forbidden("Only the course teacher or an admin can do this"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_owner_and_admin_manage() {
        assert!(CourseRole::Admin.can_manage());
        assert!(CourseRole::Owner.can_manage());
        assert!(!CourseRole::Student.can_manage());
        assert!(!CourseRole::Parent.can_manage());
    }
}
