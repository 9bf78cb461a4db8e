use async_trait::async_trait;
use chrono::Utc;
use semver::Version;
use serde_json::Value;
use sqlx::types::Json;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{GatewayError, GradingGateway, QuizGateway, RegistryGateway, SubmissionGateway};
use crate::database::models::{
    Grade, Quiz, QuizAttempt, QuizDetail, QuizQuestion, RegistryCourse, RegistryVersion, Submission,
};
use crate::services::{quiz_service, registry_service, submission_service};

#[derive(Default)]
struct MemoryState {
    quizzes: HashMap<Uuid, QuizDetail>,
    attempts: HashMap<Uuid, QuizAttempt>,
    registry_courses: HashMap<Uuid, RegistryCourse>,
    registry_versions: Vec<RegistryVersion>,
    assignment_points: HashMap<Uuid, i32>,
    submissions: HashMap<Uuid, Submission>,
    grades: HashMap<Uuid, Grade>,
}

/// Fixed ids of the records `with_fixtures` seeds
pub mod fixture_ids {
    use uuid::Uuid;

    pub const USER: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0001);
    pub const COURSE: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0010);
    pub const QUIZ: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0020);
    pub const REGISTRY_COURSE: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0030);
    pub const OPEN_ASSIGNMENT: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0040);
    pub const GRADED_ASSIGNMENT: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0041);
    pub const GRADED_SUBMISSION: Uuid = Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0050);
}

/// Local stand-in acting as a single user
pub struct InMemoryGateways {
    user_id: Uuid,
    state: RwLock<MemoryState>,
}

impl InMemoryGateways {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            state: RwLock::new(MemoryState::default()),
        }
    }

    /// Canned data for test mode: a published quiz, a published registry
    /// course with one version, an open assignment and a graded submission.
    pub fn with_fixtures() -> Self {
        use fixture_ids::*;

        let now = Utc::now();
        let mut state = MemoryState::default();

        let quiz = Quiz {
            id: QUIZ,
            course_id: COURSE,
            title: "Fractions check-in".to_string(),
            time_limit_secs: Some(900),
            max_attempts: 3,
            published: true,
            created_at: now,
        };
        let questions = vec![
            QuizQuestion {
                id: Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0021),
                quiz_id: QUIZ,
                position: 0,
                prompt: "1/2 + 1/4 = ?".to_string(),
                choices: Json(vec!["3/4".to_string(), "2/6".to_string(), "1/8".to_string()]),
                correct_index: Some(0),
                points: 1,
            },
            QuizQuestion {
                id: Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0022),
                quiz_id: QUIZ,
                position: 1,
                prompt: "Which is larger: 2/3 or 3/5?".to_string(),
                choices: Json(vec!["2/3".to_string(), "3/5".to_string()]),
                correct_index: Some(0),
                points: 2,
            },
        ];
        state.quizzes.insert(QUIZ, QuizDetail { quiz, questions });

        state.registry_courses.insert(
            REGISTRY_COURSE,
            RegistryCourse {
                id: REGISTRY_COURSE,
                external_id: "demo-algebra-1".to_string(),
                provider: "demo".to_string(),
                title: "Algebra I".to_string(),
                description: Some("Linear equations and inequalities".to_string()),
                status: "published".to_string(),
                created_by: USER,
                created_at: now,
                updated_at: now,
            },
        );
        state.registry_versions.push(RegistryVersion {
            id: Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0031),
            registry_course_id: REGISTRY_COURSE,
            version: "1.0.0".to_string(),
            manifest: serde_json::json!({ "modules": 4 }),
            status: "approved".to_string(),
            created_by: USER,
            reviewed_by: Some(USER),
            created_at: now,
        });

        state.assignment_points.insert(OPEN_ASSIGNMENT, 10);
        state.assignment_points.insert(GRADED_ASSIGNMENT, 20);
        state.submissions.insert(
            GRADED_SUBMISSION,
            Submission {
                id: GRADED_SUBMISSION,
                assignment_id: GRADED_ASSIGNMENT,
                student_id: USER,
                body: Some("Lab report".to_string()),
                file_id: None,
                status: "graded".to_string(),
                submitted_at: now,
            },
        );
        state.grades.insert(
            GRADED_SUBMISSION,
            Grade {
                id: Uuid::from_u128(0x0000_0000_0000_4000_8000_0000_0000_0051),
                submission_id: GRADED_SUBMISSION,
                grader_id: USER,
                score: 17.5,
                feedback: Some("Clear method section".to_string()),
                graded_at: now,
            },
        );

        Self {
            user_id: USER,
            state: RwLock::new(state),
        }
    }

    pub async fn insert_quiz(&self, quiz: Quiz, questions: Vec<QuizQuestion>) {
        self.state.write().await.quizzes.insert(quiz.id, QuizDetail { quiz, questions });
    }

    pub async fn insert_registry_course(&self, course: RegistryCourse) {
        self.state.write().await.registry_courses.insert(course.id, course);
    }

    pub async fn insert_assignment(&self, assignment_id: Uuid, points: i32) {
        self.state.write().await.assignment_points.insert(assignment_id, points);
    }
}

#[async_trait]
impl QuizGateway for InMemoryGateways {
    async fn get_quiz(&self, quiz_id: Uuid) -> Result<QuizDetail, GatewayError> {
        let state = self.state.read().await;
        let mut detail = state
            .quizzes
            .get(&quiz_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("Quiz not found"))?;
        quiz_service::hide_answers(&mut detail.questions);
        Ok(detail)
    }

    async fn start_attempt(&self, quiz_id: Uuid) -> Result<QuizAttempt, GatewayError> {
        let mut state = self.state.write().await;
        let quiz = state
            .quizzes
            .get(&quiz_id)
            .map(|d| d.quiz.clone())
            .ok_or_else(|| GatewayError::not_found("Quiz not found"))?;
        if !quiz.published {
            return Err(GatewayError::not_found("Quiz not found"));
        }

        let mine: Vec<&QuizAttempt> = state
            .attempts
            .values()
            .filter(|a| a.quiz_id == quiz_id && a.student_id == self.user_id)
            .collect();
        if let Some(open) = mine.iter().find(|a| a.submitted_at.is_none()) {
            return Ok((*open).clone());
        }
        if mine.len() as i32 >= quiz.max_attempts {
            return Err(GatewayError::conflict(format!(
                "Maximum of {} attempt(s) reached",
                quiz.max_attempts
            )));
        }

        let attempt = QuizAttempt {
            id: Uuid::new_v4(),
            quiz_id,
            student_id: self.user_id,
            started_at: Utc::now(),
            submitted_at: None,
            answers: None,
            score: None,
        };
        state.attempts.insert(attempt.id, attempt.clone());
        Ok(attempt)
    }

    async fn submit_attempt(&self, attempt_id: Uuid, answers: Vec<Option<i32>>) -> Result<QuizAttempt, GatewayError> {
        let mut state = self.state.write().await;
        let attempt = state
            .attempts
            .get(&attempt_id)
            .cloned()
            .filter(|a| a.student_id == self.user_id)
            .ok_or_else(|| GatewayError::not_found("Attempt not found"))?;
        if attempt.submitted_at.is_some() {
            return Err(GatewayError::conflict("Attempt has already been submitted"));
        }

        let detail = state
            .quizzes
            .get(&attempt.quiz_id)
            .ok_or_else(|| GatewayError::not_found("Quiz not found"))?;
        if answers.len() != detail.questions.len() {
            return Err(GatewayError::invalid(format!(
                "Expected {} answers, got {}",
                detail.questions.len(),
                answers.len()
            )));
        }
        let now = Utc::now();
        if !quiz_service::within_time_limit(attempt.started_at, detail.quiz.time_limit_secs, now) {
            return Err(GatewayError::conflict("Time limit for this attempt has passed"));
        }

        let score = quiz_service::score_answers(&detail.questions, &answers);
        let submitted = QuizAttempt {
            submitted_at: Some(now),
            answers: Some(Json(answers)),
            score: Some(score),
            ..attempt
        };
        state.attempts.insert(attempt_id, submitted.clone());
        Ok(submitted)
    }
}

#[async_trait]
impl RegistryGateway for InMemoryGateways {
    async fn list_courses(&self, status: Option<&str>) -> Result<Vec<RegistryCourse>, GatewayError> {
        let state = self.state.read().await;
        let mut courses: Vec<RegistryCourse> = state
            .registry_courses
            .values()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(courses)
    }

    async fn list_versions(&self, course_id: Uuid) -> Result<Vec<RegistryVersion>, GatewayError> {
        let state = self.state.read().await;
        if !state.registry_courses.contains_key(&course_id) {
            return Err(GatewayError::not_found("Registry course not found"));
        }
        let mut versions: Vec<RegistryVersion> = state
            .registry_versions
            .iter()
            .filter(|v| v.registry_course_id == course_id)
            .cloned()
            .collect();
        versions.reverse();
        Ok(versions)
    }

    async fn publish_version(&self, course_id: Uuid, version: &str, manifest: Value) -> Result<RegistryVersion, GatewayError> {
        let parsed = Version::parse(version).map_err(|e| GatewayError::invalid(format!("version: {}", e)))?;
        if !manifest.is_object() {
            return Err(GatewayError::invalid("manifest must be a JSON object"));
        }

        let mut state = self.state.write().await;
        if !state.registry_courses.contains_key(&course_id) {
            return Err(GatewayError::not_found("Registry course not found"));
        }
        let existing = state
            .registry_versions
            .iter()
            .filter(|v| v.registry_course_id == course_id)
            .map(|v| v.version.as_str());
        registry_service::ensure_newer(existing, &parsed).map_err(GatewayError::conflict)?;

        let created = RegistryVersion {
            id: Uuid::new_v4(),
            registry_course_id: course_id,
            version: parsed.to_string(),
            manifest,
            status: "pending".to_string(),
            created_by: self.user_id,
            reviewed_by: None,
            created_at: Utc::now(),
        };
        state.registry_versions.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl SubmissionGateway for InMemoryGateways {
    async fn submit(&self, assignment_id: Uuid, body: Option<String>, file_id: Option<Uuid>) -> Result<Submission, GatewayError> {
        if !submission_service::has_content(body.as_deref(), file_id) {
            return Err(GatewayError::invalid("Provide a body or a file_id"));
        }
        if body.as_deref().is_some_and(|b| b.chars().count() > submission_service::MAX_BODY_CHARS) {
            return Err(GatewayError::invalid(format!(
                "body must be at most {} characters",
                submission_service::MAX_BODY_CHARS
            )));
        }

        let mut state = self.state.write().await;
        if !state.assignment_points.contains_key(&assignment_id) {
            return Err(GatewayError::not_found("Assignment not found"));
        }

        let existing = state
            .submissions
            .values()
            .find(|s| s.assignment_id == assignment_id && s.student_id == self.user_id)
            .cloned();
        if existing.as_ref().is_some_and(|s| s.status == "graded") {
            return Err(GatewayError::conflict("Submission has already been graded"));
        }

        let submission = Submission {
            id: existing.map_or_else(Uuid::new_v4, |s| s.id),
            assignment_id,
            student_id: self.user_id,
            body,
            file_id,
            status: "submitted".to_string(),
            submitted_at: Utc::now(),
        };
        state.submissions.insert(submission.id, submission.clone());
        Ok(submission)
    }

    async fn list(&self, assignment_id: Uuid) -> Result<Vec<Submission>, GatewayError> {
        let state = self.state.read().await;
        Ok(state
            .submissions
            .values()
            .filter(|s| s.assignment_id == assignment_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl GradingGateway for InMemoryGateways {
    async fn set_grade(&self, submission_id: Uuid, score: f64, feedback: Option<String>) -> Result<Grade, GatewayError> {
        let mut state = self.state.write().await;
        let submission = state
            .submissions
            .get(&submission_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("Submission not found"))?;
        let points = state
            .assignment_points
            .get(&submission.assignment_id)
            .copied()
            .unwrap_or(0);
        if !(0.0..=f64::from(points)).contains(&score) {
            return Err(GatewayError::invalid(format!("score must be between 0 and {}", points)));
        }

        let grade = Grade {
            id: state.grades.get(&submission_id).map_or_else(Uuid::new_v4, |g| g.id),
            submission_id,
            grader_id: self.user_id,
            score,
            feedback,
            graded_at: Utc::now(),
        };
        state.grades.insert(submission_id, grade.clone());
        if let Some(s) = state.submissions.get_mut(&submission_id) {
            s.status = "graded".to_string();
        }
        Ok(grade)
    }

    async fn get_grade(&self, submission_id: Uuid) -> Result<Grade, GatewayError> {
        self.state
            .read()
            .await
            .grades
            .get(&submission_id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("Grade not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn quiz(max_attempts: i32, time_limit_secs: Option<i32>) -> Quiz {
        Quiz {
            id: Uuid::new_v4(),
            course_id: Uuid::new_v4(),
            title: "Fractions".into(),
            time_limit_secs,
            max_attempts,
            published: true,
            created_at: Utc::now(),
        }
    }

    fn question(quiz_id: Uuid, correct: i32, points: i32) -> QuizQuestion {
        QuizQuestion {
            id: Uuid::new_v4(),
            quiz_id,
            position: 0,
            prompt: "1/2 + 1/4?".into(),
            choices: Json(vec!["3/4".into(), "2/6".into()]),
            correct_index: Some(correct),
            points,
        }
    }

    #[tokio::test]
    async fn quiz_flow_scores_and_limits_attempts() {
        let gw = InMemoryGateways::new(Uuid::new_v4());
        let q = quiz(1, None);
        let quiz_id = q.id;
        gw.insert_quiz(q, vec![question(quiz_id, 0, 2), question(quiz_id, 1, 3)]).await;

        let detail = gw.get_quiz(quiz_id).await.unwrap();
        assert!(detail.questions.iter().all(|q| q.correct_index.is_none()));

        let attempt = gw.start_attempt(quiz_id).await.unwrap();
        let again = gw.start_attempt(quiz_id).await.unwrap();
        assert_eq!(attempt.id, again.id);

        let short = gw.submit_attempt(attempt.id, vec![Some(0)]).await.unwrap_err();
        assert_eq!(short.status(), Some(400));

        let done = gw.submit_attempt(attempt.id, vec![Some(0), Some(0)]).await.unwrap();
        assert_eq!(done.score, Some(2.0));

        let twice = gw.submit_attempt(attempt.id, vec![Some(0), Some(1)]).await.unwrap_err();
        assert_eq!(twice.status(), Some(409));

        let exhausted = gw.start_attempt(quiz_id).await.unwrap_err();
        assert_eq!(exhausted.status(), Some(409));
    }

    #[tokio::test]
    async fn fixtures_answer_every_gateway() {
        use super::fixture_ids::*;

        let gw = InMemoryGateways::with_fixtures();

        let detail = gw.get_quiz(QUIZ).await.unwrap();
        assert_eq!(detail.questions.len(), 2);
        let attempt = gw.start_attempt(QUIZ).await.unwrap();
        let scored = gw.submit_attempt(attempt.id, vec![Some(0), Some(1)]).await.unwrap();
        assert_eq!(scored.score, Some(1.0));

        assert_eq!(gw.list_courses(Some("published")).await.unwrap().len(), 1);
        assert_eq!(gw.list_versions(REGISTRY_COURSE).await.unwrap()[0].version, "1.0.0");
        gw.publish_version(REGISTRY_COURSE, "1.1.0", json!({})).await.unwrap();

        assert_eq!(gw.get_grade(GRADED_SUBMISSION).await.unwrap().score, 17.5);
        assert_eq!(gw.list(GRADED_ASSIGNMENT).await.unwrap().len(), 1);
        let submission = gw.submit(OPEN_ASSIGNMENT, Some("draft".into()), None).await.unwrap();
        assert_eq!(gw.set_grade(submission.id, 8.0, None).await.unwrap().score, 8.0);
    }

    #[tokio::test]
    async fn blank_submissions_are_rejected() {
        let gw = InMemoryGateways::new(Uuid::new_v4());
        let assignment_id = Uuid::new_v4();
        gw.insert_assignment(assignment_id, 10).await;

        for body in ["", "   \n"] {
            let err = gw.submit(assignment_id, Some(body.into()), None).await.unwrap_err();
            assert_eq!(err.status(), Some(400));
        }
        assert!(gw.submit(assignment_id, Some(" ".into()), Some(Uuid::new_v4())).await.is_ok());
    }

    #[tokio::test]
    async fn registry_versions_must_increase() {
        let gw = InMemoryGateways::new(Uuid::new_v4());
        let course = RegistryCourse {
            id: Uuid::new_v4(),
            external_id: "ext-1".into(),
            provider: "acme".into(),
            title: "Algebra".into(),
            description: None,
            status: "published".into(),
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let course_id = course.id;
        gw.insert_registry_course(course).await;

        gw.publish_version(course_id, "1.0.0", json!({})).await.unwrap();
        gw.publish_version(course_id, "1.1.0", json!({"modules": 3})).await.unwrap();
        let err = gw.publish_version(course_id, "1.0.5", json!({})).await.unwrap_err();
        assert_eq!(err.status(), Some(409));
        let err = gw.publish_version(course_id, "one", json!({})).await.unwrap_err();
        assert_eq!(err.status(), Some(400));

        let versions = gw.list_versions(course_id).await.unwrap();
        assert_eq!(versions[0].version, "1.1.0");
        assert_eq!(gw.list_courses(Some("draft")).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn grading_bounds_and_locks_submission() {
        let gw = InMemoryGateways::new(Uuid::new_v4());
        let assignment_id = Uuid::new_v4();
        gw.insert_assignment(assignment_id, 10).await;

        let submission = gw.submit(assignment_id, Some("essay".into()), None).await.unwrap();
        assert_eq!(gw.set_grade(submission.id, 11.0, None).await.unwrap_err().status(), Some(400));

        let grade = gw.set_grade(submission.id, 9.5, Some("Great".into())).await.unwrap();
        assert_eq!(gw.get_grade(submission.id).await.unwrap().score, grade.score);

        let resubmit = gw.submit(assignment_id, Some("v2".into()), None).await.unwrap_err();
        assert_eq!(resubmit.status(), Some(409));
    }
}
