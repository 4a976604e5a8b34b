use axum::{
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Test {0} does not exist or is not published")]
    TestNotFound(Uuid),

    #[error("No active access to this test: {0}")]
    AccessDenied(String),

    #[error("Maximum number of attempts ({max_attempts}) reached for this test")]
    AttemptLimitExceeded { max_attempts: i32 },

    #[error("A session is already active for this test; abandon it before starting a new one")]
    SessionAlreadyActive,

    #[error("Session not found or no longer active")]
    SessionNotFound,

    #[error("Session has expired")]
    SessionExpired,

    #[error("Question {0} is not part of this test")]
    QuestionNotInTest(Uuid),

    #[error("Skipping questions is not allowed for this test")]
    SkipNotAllowed,

    #[error("No active session for this test")]
    NoActiveSession,

    #[error("Attempt has not been submitted yet")]
    AttemptNotSubmitted,

    #[error("Answer review is not available for this test")]
    ReviewNotAllowed,

    #[error("Attempt does not belong to the caller")]
    NotOwner,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),

    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code returned in the `error` field of every error body.
    pub fn code(&self) -> &'static str {
        match self {
            Error::BadRequest(_) | Error::Json(_) => "bad_request",
            Error::Validation(_) => "validation_error",
            Error::Unauthorized(_) => "unauthorized",
            Error::NotFound(_) => "not_found",
            Error::TestNotFound(_) => "test_not_found",
            Error::AccessDenied(_) => "access_denied",
            Error::AttemptLimitExceeded { .. } => "attempt_limit_exceeded",
            Error::SessionAlreadyActive => "session_already_active",
            Error::SessionNotFound => "session_not_found",
            Error::SessionExpired => "session_expired",
            Error::QuestionNotInTest(_) => "question_not_in_test",
            Error::SkipNotAllowed => "skip_not_allowed",
            Error::NoActiveSession => "no_active_session",
            Error::AttemptNotSubmitted => "attempt_not_submitted",
            Error::ReviewNotAllowed => "review_not_allowed",
            Error::NotOwner => "not_owner",
            Error::Config(_)
            | Error::Database(_)
            | Error::Anyhow(_)
            | Error::Reqwest(_)
            | Error::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_)
            | Error::Json(_)
            | Error::Validation(_)
            | Error::AttemptLimitExceeded { .. }
            | Error::SessionAlreadyActive
            | Error::SessionNotFound
            | Error::SessionExpired
            | Error::QuestionNotInTest(_)
            | Error::SkipNotAllowed
            | Error::NoActiveSession
            | Error::AttemptNotSubmitted
            | Error::ReviewNotAllowed => StatusCode::BAD_REQUEST,
            Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Error::AccessDenied(_) | Error::NotOwner => StatusCode::FORBIDDEN,
            Error::NotFound(_) | Error::TestNotFound(_) => StatusCode::NOT_FOUND,
            Error::Reqwest(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_) | Error::Database(_) | Error::Anyhow(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "An unexpected error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({ "error": self.code(), "message": message }));
        (status, body).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::NotFound("Resource not found".to_string()),
            other => Error::Database(other),
        }
    }
}
