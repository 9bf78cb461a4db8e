use async_trait::async_trait;
use serde_json::json;

use super::{JobContext, JobError, JobOutcome, MaintenanceJob};
use crate::database::DatabaseError;
use crate::services::notification_service::NotificationKind;

/// Reminds enrolled students about assignments due within the window that
/// they have not submitted yet. Each (student, assignment) pair is
/// reminded at most once.
pub struct DueSoonJob {
    window_hours: i64,
}

impl DueSoonJob {
    pub fn new(window_hours: i64) -> Self {
        Self { window_hours: window_hours.max(1) }
    }
}

#[async_trait]
impl MaintenanceJob for DueSoonJob {
    fn name(&self) -> &'static str {
        "due-soon"
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome, JobError> {
        let result = sqlx::query(
            "INSERT INTO notifications (user_id, kind, title, body, payload)
             SELECT e.student_id, $2, 'Assignment due soon: ' || a.title, NULL,
                    jsonb_build_object('assignment_id', a.id, 'course_id', a.course_id, 'due_at', a.due_at)
             FROM assignments a
             JOIN enrollments e ON e.course_id = a.course_id
             WHERE a.due_at > now()
               AND a.due_at <= now() + make_interval(hours => $1::int)
               AND NOT EXISTS (
                   SELECT 1 FROM submissions s
                   WHERE s.assignment_id = a.id AND s.student_id = e.student_id)
               AND NOT EXISTS (
                   SELECT 1 FROM notifications n
                   WHERE n.user_id = e.student_id AND n.kind = $2
                     AND n.payload->>'assignment_id' = a.id::text)",
        )
        .bind(self.window_hours)
        .bind(NotificationKind::DueSoon.as_str())
        .execute(&ctx.pool)
        .await
        .map_err(DatabaseError::from)?;

        let sent = result.rows_affected();
        Ok(JobOutcome::new(sent, json!({ "window_hours": self.window_hours, "notified": sent })))
    }
}
