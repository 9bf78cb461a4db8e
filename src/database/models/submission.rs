use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Submission {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub student_id: Uuid,
    pub body: Option<String>,
    pub file_id: Option<Uuid>,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Grade {
    pub id: Uuid,
    pub submission_id: Uuid,
    pub grader_id: Uuid,
    pub score: f64,
    pub feedback: Option<String>,
    pub graded_at: DateTime<Utc>,
}

/// Grade joined with the assignment and course it belongs to
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GradeView {
    pub submission_id: Uuid,
    pub assignment_id: Uuid,
    pub assignment_title: String,
    pub course_id: Uuid,
    pub course_title: String,
    pub points: i32,
    pub score: f64,
    pub feedback: Option<String>,
    pub graded_at: DateTime<Utc>,
}
