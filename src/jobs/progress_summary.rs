use async_trait::async_trait;
use serde_json::json;

use super::{JobContext, JobError, JobOutcome, MaintenanceJob};
use crate::database::DatabaseError;

/// Recomputes per-enrollment progress: assignment counts and the average
/// graded percentage.
pub struct ProgressSummaryJob;

#[async_trait]
impl MaintenanceJob for ProgressSummaryJob {
    fn name(&self) -> &'static str {
        "progress-summary"
    }

    async fn run(&self, ctx: &JobContext) -> Result<JobOutcome, JobError> {
        let result = sqlx::query(
            "INSERT INTO progress_summaries
                (course_id, student_id, assignments_total, assignments_submitted, average_percent, refreshed_at)
             SELECT e.course_id, e.student_id,
                    (SELECT COUNT(*) FROM assignments a WHERE a.course_id = e.course_id)::int,
                    (SELECT COUNT(*) FROM submissions s
                       JOIN assignments a ON a.id = s.assignment_id
                      WHERE a.course_id = e.course_id AND s.student_id = e.student_id)::int,
                    (SELECT AVG(g.score * 100.0 / NULLIF(a.points, 0)) FROM grades g
                       JOIN submissions s ON s.id = g.submission_id
                       JOIN assignments a ON a.id = s.assignment_id
                      WHERE a.course_id = e.course_id AND s.student_id = e.student_id)::double precision,
                    now()
             FROM enrollments e
             ON CONFLICT (course_id, student_id) DO UPDATE SET
                assignments_total = EXCLUDED.assignments_total,
                assignments_submitted = EXCLUDED.assignments_submitted,
                average_percent = EXCLUDED.average_percent,
                refreshed_at = EXCLUDED.refreshed_at",
        )
        .execute(&ctx.pool)
        .await
        .map_err(DatabaseError::from)?;

        let refreshed = result.rows_affected();
        Ok(JobOutcome::new(refreshed, json!({ "refreshed": refreshed })))
    }
}
