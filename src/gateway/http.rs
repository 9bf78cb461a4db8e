use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

use super::{GatewayError, GradingGateway, QuizGateway, RegistryGateway, SubmissionGateway};
use crate::database::models::{Grade, QuizAttempt, QuizDetail, RegistryCourse, RegistryVersion, Submission};

/// Gateways over the platform REST API
pub struct HttpGateways {
    base: url::Url,
    token: Option<String>,
    client: Client,
}

impl HttpGateways {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, GatewayError> {
        let mut base = url::Url::parse(base_url).map_err(|_| GatewayError::NotConfigured("EDU_API_URL"))?;
        // `join` replaces the last segment unless the path ends in a slash
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { base, token, client })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, GatewayError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| GatewayError::Decode(format!("bad path {}: {}", path, e)))?;
        let mut builder = self.client.request(method, url);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    /// Send and unwrap the `{success, data | error}` envelope
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, GatewayError> {
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("HTTP {} with non-JSON body: {}", status, e)))?;

        if body.get("success").and_then(Value::as_bool) == Some(true) {
            let data = body.get("data").cloned().unwrap_or(Value::Null);
            return serde_json::from_value(data).map_err(|e| GatewayError::Decode(e.to_string()));
        }

        let error = body.get("error");
        let code = error
            .and_then(|e| e.get("code"))
            .and_then(Value::as_str)
            .unwrap_or("UNKNOWN");
        let message = error
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("request failed");
        Err(GatewayError::api(status, code, message))
    }
}

#[async_trait]
impl QuizGateway for HttpGateways {
    async fn get_quiz(&self, quiz_id: Uuid) -> Result<QuizDetail, GatewayError> {
        self.send(self.request(Method::GET, &format!("api/quizzes/{}", quiz_id))?).await
    }

    async fn start_attempt(&self, quiz_id: Uuid) -> Result<QuizAttempt, GatewayError> {
        self.send(self.request(Method::POST, &format!("api/quizzes/{}/attempts", quiz_id))?).await
    }

    async fn submit_attempt(&self, attempt_id: Uuid, answers: Vec<Option<i32>>) -> Result<QuizAttempt, GatewayError> {
        let request = self
            .request(Method::POST, &format!("api/attempts/{}/submit", attempt_id))?
            .json(&json!({ "answers": answers }));
        self.send(request).await
    }
}

#[async_trait]
impl RegistryGateway for HttpGateways {
    async fn list_courses(&self, status: Option<&str>) -> Result<Vec<RegistryCourse>, GatewayError> {
        let mut request = self.request(Method::GET, "api/registry/courses")?;
        if let Some(status) = status {
            request = request.query(&[("status", status)]);
        }
        self.send(request).await
    }

    async fn list_versions(&self, course_id: Uuid) -> Result<Vec<RegistryVersion>, GatewayError> {
        self.send(self.request(Method::GET, &format!("api/registry/courses/{}/versions", course_id))?)
            .await
    }

    async fn publish_version(&self, course_id: Uuid, version: &str, manifest: Value) -> Result<RegistryVersion, GatewayError> {
        let request = self
            .request(Method::POST, &format!("api/registry/courses/{}/versions", course_id))?
            .json(&json!({ "version": version, "manifest": manifest }));
        self.send(request).await
    }
}

#[async_trait]
impl SubmissionGateway for HttpGateways {
    async fn submit(&self, assignment_id: Uuid, body: Option<String>, file_id: Option<Uuid>) -> Result<Submission, GatewayError> {
        let request = self
            .request(Method::POST, &format!("api/assignments/{}/submissions", assignment_id))?
            .json(&json!({ "body": body, "file_id": file_id }));
        self.send(request).await
    }

    async fn list(&self, assignment_id: Uuid) -> Result<Vec<Submission>, GatewayError> {
        self.send(self.request(Method::GET, &format!("api/assignments/{}/submissions", assignment_id))?)
            .await
    }
}

#[async_trait]
impl GradingGateway for HttpGateways {
    async fn set_grade(&self, submission_id: Uuid, score: f64, feedback: Option<String>) -> Result<Grade, GatewayError> {
        let request = self
            .request(Method::PUT, &format!("api/submissions/{}/grade", submission_id))?
            .json(&json!({ "score": score, "feedback": feedback }));
        self.send(request).await
    }

    async fn get_grade(&self, submission_id: Uuid) -> Result<Grade, GatewayError> {
        self.send(self.request(Method::GET, &format!("api/submissions/{}/grade", submission_id))?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateways(server: &MockServer) -> HttpGateways {
        HttpGateways::new(&format!("{}/", server.uri()), Some("tok".into())).unwrap()
    }

    #[tokio::test]
    async fn unwraps_success_envelope() {
        let server = MockServer::start().await;
        let submission_id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path(format!("/api/submissions/{}/grade", submission_id)))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {
                    "id": Uuid::new_v4(),
                    "submission_id": submission_id,
                    "grader_id": Uuid::new_v4(),
                    "score": 8.5,
                    "feedback": "Nice",
                    "graded_at": "2025-03-01T10:00:00Z"
                },
                "request_id": "r1"
            })))
            .mount(&server)
            .await;

        let grade = gateways(&server).get_grade(submission_id).await.unwrap();
        assert_eq!(grade.score, 8.5);
        assert_eq!(grade.feedback.as_deref(), Some("Nice"));
    }

    #[tokio::test]
    async fn maps_error_envelope() {
        let server = MockServer::start().await;
        let course_id = Uuid::new_v4();
        Mock::given(method("POST"))
            .and(path(format!("/api/registry/courses/{}/versions", course_id)))
            .and(body_json(json!({ "version": "1.0.0", "manifest": {} })))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "success": false,
                "error": { "code": "CONFLICT", "message": "Version 1.0.0 must be greater than the latest version 1.2.0" },
                "request_id": "r2"
            })))
            .mount(&server)
            .await;

        let err = gateways(&server)
            .publish_version(course_id, "1.0.0", json!({}))
            .await
            .unwrap_err();
        match err {
            GatewayError::Api { status, code, message } => {
                assert_eq!(status, 409);
                assert_eq!(code, "CONFLICT");
                assert!(message.contains("1.2.0"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn keeps_base_path_without_trailing_slash() {
        let server = MockServer::start().await;
        let submission_id = Uuid::new_v4();
        Mock::given(method("GET"))
            .and(path(format!("/v1/api/submissions/{}/grade", submission_id)))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "success": false,
                "error": { "code": "NOT_FOUND", "message": "Grade not found" }
            })))
            .mount(&server)
            .await;

        let gateways = HttpGateways::new(&format!("{}/v1", server.uri()), None).unwrap();
        let err = gateways.get_grade(submission_id).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn non_json_bodies_are_decode_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/registry/courses"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = gateways(&server).list_courses(None).await.unwrap_err();
        assert!(matches!(err, GatewayError::Decode(_)));
    }
}
