use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::question::QuestionType;
use crate::models::test_attempt::TestAttempt;
use crate::models::test_session::{SessionStatus, TestSession};
use crate::services::scoring_service::ScoringService;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct StartTestRequest {
    /// Serve at most this many questions from the test's bank.
    #[validate(range(min = 1, max = 1000))]
    pub max_questions: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHandle {
    pub session_id: String,
    pub attempt_id: Uuid,
    pub test_id: Uuid,
    pub attempt_number: i32,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub time_remaining_seconds: i64,
    pub total_questions: i32,
    pub total_marks: Decimal,
}

impl SessionHandle {
    pub fn new(session: &TestSession, attempt: &TestAttempt, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session.session_id.clone(),
            attempt_id: attempt.id,
            test_id: attempt.test_id,
            attempt_number: attempt.attempt_number,
            status: session.status,
            started_at: session.started_at,
            expires_at: session.expires_at,
            time_remaining_seconds: session.time_remaining(now),
            total_questions: attempt.total_questions,
            total_marks: attempt.marks_available,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveSessionResponse {
    pub has_active_session: bool,
    #[serde(flatten)]
    pub session: Option<SessionHandle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions_answered: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionView {
    pub id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedAnswerView {
    pub selected_option_ids: Vec<Uuid>,
    pub answer_text: Option<String>,
    pub is_answered: bool,
    pub flagged_for_review: bool,
    pub answered_at: DateTime<Utc>,
}

/// A question as served to the student: no answer key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    pub marks: Decimal,
    pub options: Vec<OptionView>,
    pub saved_answer: Option<SavedAnswerView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestQuestionsResponse {
    pub session_id: String,
    pub status: SessionStatus,
    pub time_remaining_seconds: i64,
    pub allow_skip: bool,
    pub allow_review: bool,
    pub questions: Vec<QuestionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    pub question_id: Uuid,
    #[serde(default)]
    #[validate(length(max = 64))]
    pub selected_option_ids: Vec<Uuid>,
    #[validate(length(max = 10000))]
    pub answer_text: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub time_spent_seconds: i32,
    #[serde(default)]
    pub flagged_for_review: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub saved: bool,
    pub question_id: Uuid,
    pub is_answered: bool,
    pub flagged_for_review: bool,
    pub answered_at: DateTime<Utc>,
    pub time_remaining_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub attempt_id: Uuid,
    pub test_id: Uuid,
    pub attempt_number: i32,
    pub total_questions: i32,
    pub answered_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub unanswered_questions: i32,
    pub marks_obtained: Decimal,
    pub marks_available: Decimal,
    pub percentage: Decimal,
    pub display_percentage: Decimal,
    pub passing_marks: Decimal,
    pub passed: bool,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub time_taken_seconds: Option<i32>,
}

impl From<&TestAttempt> for TestResult {
    fn from(attempt: &TestAttempt) -> Self {
        Self {
            attempt_id: attempt.id,
            test_id: attempt.test_id,
            attempt_number: attempt.attempt_number,
            total_questions: attempt.total_questions,
            answered_questions: attempt.answered_questions,
            correct_answers: attempt.correct_answers,
            wrong_answers: attempt.wrong_answers,
            unanswered_questions: attempt.unanswered_questions,
            marks_obtained: attempt.marks_obtained,
            marks_available: attempt.marks_available,
            percentage: attempt.percentage,
            display_percentage: ScoringService::display_percentage(attempt.percentage),
            passing_marks: attempt.passing_marks,
            passed: attempt.passed,
            started_at: attempt.started_at,
            submitted_at: attempt.submitted_at,
            time_taken_seconds: attempt.time_taken_seconds,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub attempt_id: Uuid,
    pub test_id: Uuid,
    pub attempt_number: i32,
    pub submitted: bool,
    pub active: bool,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    /// Present only once the attempt has been scored.
    pub result: Option<TestResult>,
}

impl From<&TestAttempt> for AttemptSummary {
    fn from(attempt: &TestAttempt) -> Self {
        Self {
            attempt_id: attempt.id,
            test_id: attempt.test_id,
            attempt_number: attempt.attempt_number,
            submitted: attempt.submitted,
            active: attempt.active,
            started_at: attempt.started_at,
            submitted_at: attempt.submitted_at,
            result: attempt.submitted.then(|| TestResult::from(attempt)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AttemptPageQuery {
    #[validate(range(min = 1))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedAttempts {
    pub items: Vec<AttemptSummary>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOptionView {
    pub id: Uuid,
    pub text: String,
    pub is_correct: bool,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewItem {
    pub question_id: Uuid,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    pub marks: Decimal,
    pub options: Vec<ReviewOptionView>,
    pub answer_text: Option<String>,
    pub accepted_answer: Option<String>,
    pub is_answered: bool,
    pub is_correct: bool,
    pub marks_obtained: Decimal,
    pub flagged_for_review: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReview {
    pub result: TestResult,
    pub questions: Vec<ReviewItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbandonResponse {
    pub abandoned: bool,
    pub attempt_id: Uuid,
    pub attempt_number: i32,
}
