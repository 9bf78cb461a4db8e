//! Router assembly: public, protected (`/api/*`) and elevated (`/api/admin/*`) tiers.

use axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::handlers::{elevated, protected, public};
use crate::middleware::{
    expertfolio_gate, jwt_auth_middleware, request_id_middleware, usage_tracking_middleware, REQUEST_ID_HEADER,
};
use crate::state::AppState;

/// The complete application router
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth_routes())
        .merge(course_routes())
        .merge(coursework_routes())
        .merge(quiz_routes())
        .merge(communication_routes())
        .merge(file_routes())
        .merge(registry_routes())
        .merge(expertfolio_routes(state.clone()))
        .merge(admin_routes())
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Protected API
        .merge(api)
        // Global middleware (last added runs first)
        .layer(from_fn_with_state(state.clone(), usage_tracking_middleware))
        .layer(RequestBodyLimitLayer::new(state.config.api.max_request_size_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.security.cors_origins))
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, REQUEST_ID_HEADER])
        .expose_headers([REQUEST_ID_HEADER]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new().route("/api/auth/whoami", get(auth::whoami))
}

fn course_routes() -> Router<AppState> {
    use protected::{announcements, courses, modules};

    Router::new()
        .route("/api/courses", get(courses::course_list).post(courses::course_create))
        .route(
            "/api/courses/:id",
            get(courses::course_get)
                .patch(courses::course_update)
                .delete(courses::course_delete),
        )
        .route("/api/courses/:id/enrollments", post(courses::enrollment_create))
        .route("/api/courses/:id/enrollments/:student_id", delete(courses::enrollment_delete))
        .route("/api/courses/:id/progress", get(courses::course_progress))
        // Modules
        .route(
            "/api/courses/:id/modules",
            get(modules::module_list).post(modules::module_create),
        )
        .route(
            "/api/modules/:id",
            patch(modules::module_update).delete(modules::module_delete),
        )
        // Announcements
        .route(
            "/api/courses/:id/announcements",
            get(announcements::announcement_list).post(announcements::announcement_create),
        )
        .route("/api/announcements/:id", delete(announcements::announcement_delete))
}

fn coursework_routes() -> Router<AppState> {
    use protected::{assignments, grading, submissions};

    Router::new()
        .route(
            "/api/courses/:id/assignments",
            get(assignments::assignment_list).post(assignments::assignment_create),
        )
        .route(
            "/api/assignments/:id",
            patch(assignments::assignment_update).delete(assignments::assignment_delete),
        )
        .route(
            "/api/assignments/:id/submissions",
            get(submissions::submission_list).post(submissions::submission_create),
        )
        .route("/api/submissions/:id", get(submissions::submission_get))
        .route("/api/submissions/:id/grade", put(grading::grade_put).get(grading::grade_get))
}

fn quiz_routes() -> Router<AppState> {
    use protected::quizzes;

    Router::new()
        .route(
            "/api/courses/:id/quizzes",
            get(quizzes::quiz_list).post(quizzes::quiz_create),
        )
        .route("/api/quizzes/:id", get(quizzes::quiz_get))
        .route("/api/quizzes/:id/questions", post(quizzes::question_create))
        .route("/api/quizzes/:id/publish", post(quizzes::quiz_publish))
        .route(
            "/api/quizzes/:id/attempts",
            get(quizzes::attempt_list).post(quizzes::attempt_start),
        )
        .route("/api/attempts/:id/submit", post(quizzes::attempt_submit))
}

fn communication_routes() -> Router<AppState> {
    use protected::{messages, notifications, parent};

    Router::new()
        .route("/api/messages", get(messages::message_list).post(messages::message_send))
        .route("/api/messages/:id/read", post(messages::message_read))
        .route("/api/notifications", get(notifications::notification_list))
        .route("/api/notifications/read-all", post(notifications::notification_read_all))
        .route("/api/notifications/:id/read", post(notifications::notification_read))
        .route("/api/parent/children", get(parent::children))
        .route("/api/parent/children/:student_id/grades", get(parent::child_grades))
}

fn file_routes() -> Router<AppState> {
    use protected::files;

    Router::new()
        .route("/api/files/upload-url", post(files::upload_url))
        .route("/api/files/:id", delete(files::delete))
        .route("/api/files/:id/complete", post(files::complete))
        .route("/api/files/:id/download-url", get(files::download_url))
}

fn registry_routes() -> Router<AppState> {
    use protected::registry;

    Router::new()
        .route(
            "/api/registry/courses",
            get(registry::course_list).post(registry::course_create),
        )
        .route(
            "/api/registry/courses/:id",
            get(registry::course_get)
                .patch(registry::course_update)
                .delete(registry::course_delete),
        )
        .route(
            "/api/registry/courses/:id/versions",
            get(registry::version_list).post(registry::version_create),
        )
        .route("/api/registry/versions/:id/review", post(registry::version_review))
        .route("/api/registry/providers", get(registry::provider_list))
}

fn expertfolio_routes(state: AppState) -> Router<AppState> {
    use protected::expertfolio;

    Router::new()
        .route(
            "/api/expertfolio/assessments",
            get(expertfolio::assessment_list).post(expertfolio::assessment_create),
        )
        .route("/api/expertfolio/assessments/:id/submit", post(expertfolio::assessment_submit))
        .route(
            "/api/expertfolio/assessments/:id/evaluations",
            get(expertfolio::evaluation_list).post(expertfolio::evaluation_create),
        )
        .route_layer(from_fn_with_state(state, expertfolio_gate))
}

fn admin_routes() -> Router<AppState> {
    use elevated::admin::{audit, dlq, jobs, licenses, usage};

    Router::new()
        .route("/api/admin/dlq", get(dlq::list))
        .route("/api/admin/dlq/:id", delete(dlq::discard))
        .route("/api/admin/dlq/:id/replay", post(dlq::replay))
        .route("/api/admin/usage", get(usage::report))
        .route("/api/admin/licenses", get(licenses::list).post(licenses::create))
        .route("/api/admin/licenses/:id", patch(licenses::update))
        .route("/api/admin/licenses/:id/assign", post(licenses::assign))
        .route("/api/admin/audit-logs", get(audit::list))
        .route("/api/admin/jobs", get(jobs::list))
        .route("/api/admin/jobs/:name/run", post(jobs::run))
}
