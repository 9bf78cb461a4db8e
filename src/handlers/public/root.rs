use axum::response::IntoResponse;
use serde_json::json;

use crate::middleware::ApiResponse;

/// GET / - service identity and endpoint index
pub async fn root() -> impl IntoResponse {
    ApiResponse::success(json!({
        "name": "Education Platform API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "public": ["/", "/health"],
            "auth": ["/api/auth/whoami"],
            "courses": [
                "/api/courses",
                "/api/courses/:id",
                "/api/courses/:id/enrollments",
                "/api/courses/:id/progress",
                "/api/courses/:course_id/modules",
                "/api/courses/:course_id/announcements",
                "/api/courses/:course_id/assignments",
                "/api/courses/:course_id/quizzes"
            ],
            "coursework": [
                "/api/assignments/:id/submissions",
                "/api/submissions/:id",
                "/api/submissions/:id/grade",
                "/api/quizzes/:id",
                "/api/quizzes/:id/attempts",
                "/api/attempts/:id/submit"
            ],
            "communication": ["/api/messages", "/api/notifications"],
            "parent": ["/api/parent/children", "/api/parent/children/:student_id/grades"],
            "files": ["/api/files/upload-url", "/api/files/:id/complete", "/api/files/:id/download-url"],
            "registry": ["/api/registry/courses", "/api/registry/providers"],
            "expertfolio": ["/api/expertfolio/assessments"],
            "admin": [
                "/api/admin/dlq",
                "/api/admin/usage",
                "/api/admin/licenses",
                "/api/admin/audit-logs",
                "/api/admin/jobs"
            ]
        }
    }))
}
