use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    response::Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::session_dto::{
    AbandonResponse, ActiveSessionResponse, AttemptPageQuery, AttemptReview, AttemptSummary,
    PaginatedAttempts, SessionHandle, SessionQuery, StartTestRequest, SubmitAnswerRequest,
    SubmitAnswerResponse, TestQuestionsResponse, TestResult,
};
use crate::error::Result;
use crate::middleware::auth::CurrentStudent;
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;

#[axum::debug_handler]
pub async fn start_test(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
    CurrentStudent(student_id): CurrentStudent,
    body: Bytes,
) -> Result<Json<SessionHandle>> {
    let req = parse_start_request(&body)?;
    req.validate()?;
    let handle = state.session_service.start(test_id, student_id, req).await?;
    Ok(Json(handle))
}

/// An empty body starts with the test's defaults; anything else must be valid JSON.
fn parse_start_request(body: &[u8]) -> Result<StartTestRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StartTestRequest::default());
    }
    Ok(serde_json::from_slice(body)?)
}

#[axum::debug_handler]
pub async fn get_test_questions(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
    CurrentStudent(student_id): CurrentStudent,
    Query(query): Query<SessionQuery>,
) -> Result<Json<TestQuestionsResponse>> {
    let questions = state
        .session_service
        .get_test_questions(test_id, &query.session_id, student_id)
        .await?;
    Ok(Json(questions))
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
    CurrentStudent(student_id): CurrentStudent,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>> {
    payload.validate()?;
    let ack = state
        .session_service
        .submit_answer(test_id, student_id, payload)
        .await?;
    Ok(Json(ack))
}

#[axum::debug_handler]
pub async fn submit_test(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
    CurrentStudent(student_id): CurrentStudent,
    Query(query): Query<SessionQuery>,
) -> Result<Json<TestResult>> {
    let result = state
        .session_service
        .submit_test(test_id, &query.session_id, student_id)
        .await?;
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn get_active_session(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
    CurrentStudent(student_id): CurrentStudent,
) -> Result<Json<ActiveSessionResponse>> {
    let active = state
        .session_service
        .get_active_session(test_id, student_id)
        .await?;
    Ok(Json(active))
}

#[axum::debug_handler]
pub async fn abandon_session(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
    CurrentStudent(student_id): CurrentStudent,
) -> Result<Json<AbandonResponse>> {
    let ack = state
        .session_service
        .abandon_session(test_id, student_id)
        .await?;
    Ok(Json(ack))
}

#[axum::debug_handler]
pub async fn get_test_attempts(
    State(state): State<AppState>,
    Path(test_id): Path<Uuid>,
    CurrentStudent(student_id): CurrentStudent,
) -> Result<Json<Vec<AttemptSummary>>> {
    let attempts = state
        .session_service
        .get_test_attempts(test_id, student_id)
        .await?;
    Ok(Json(attempts))
}

#[axum::debug_handler]
pub async fn get_student_attempts(
    State(state): State<AppState>,
    CurrentStudent(student_id): CurrentStudent,
    Query(query): Query<AttemptPageQuery>,
) -> Result<Json<PaginatedAttempts>> {
    query.validate()?;
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    let attempts = state
        .session_service
        .get_student_attempts(student_id, page, limit)
        .await?;
    Ok(Json(attempts))
}

#[axum::debug_handler]
pub async fn get_test_result(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
    CurrentStudent(student_id): CurrentStudent,
) -> Result<Json<TestResult>> {
    let result = state
        .session_service
        .get_test_result(attempt_id, student_id)
        .await?;
    Ok(Json(result))
}

#[axum::debug_handler]
pub async fn get_attempt_review(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
    CurrentStudent(student_id): CurrentStudent,
) -> Result<Json<AttemptReview>> {
    let review = state
        .session_service
        .get_attempt_review(attempt_id, student_id)
        .await?;
    Ok(Json(review))
}
