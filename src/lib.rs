pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use axum::{
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;

use crate::error::Result;
use crate::services::access_gate::{self, SharedAccessGate};
use crate::services::session_service::TestSessionService;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub session_service: TestSessionService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Result<Self> {
        let config = crate::config::get_config();
        let gate = access_gate::from_config(
            pool.clone(),
            config.access_gate_url.as_deref(),
            config.access_gate_timeout_secs,
        )?;
        Ok(Self::with_access_gate(pool, gate))
    }

    pub fn with_access_gate(pool: PgPool, access_gate: SharedAccessGate) -> Self {
        let session_service = TestSessionService::new(pool.clone(), access_gate);
        Self {
            pool,
            session_service,
        }
    }
}

/// Student API under `/api/student` plus the unauthenticated health check.
pub fn router(state: AppState, student_rps: u32) -> Router {
    let student_api = Router::new()
        .route("/tests/:test_id/start", post(routes::sessions::start_test))
        .route(
            "/tests/:test_id/questions",
            get(routes::sessions::get_test_questions),
        )
        .route(
            "/tests/:test_id/submit-answer",
            post(routes::sessions::submit_answer),
        )
        .route("/tests/:test_id/submit", post(routes::sessions::submit_test))
        .route(
            "/tests/:test_id/active-session",
            get(routes::sessions::get_active_session),
        )
        .route(
            "/tests/:test_id/abandon-session",
            delete(routes::sessions::abandon_session),
        )
        .route(
            "/tests/:test_id/attempts",
            get(routes::sessions::get_test_attempts),
        )
        .route("/attempts", get(routes::sessions::get_student_attempts))
        .route(
            "/results/:attempt_id",
            get(routes::sessions::get_test_result),
        )
        .route(
            "/results/:attempt_id/review",
            get(routes::sessions::get_attempt_review),
        )
        .layer(axum::middleware::from_fn_with_state(
            crate::middleware::rate_limit::new_rps_state(student_rps),
            crate::middleware::rate_limit::rps_middleware,
        ))
        .layer(axum::middleware::from_fn(
            crate::middleware::auth::require_bearer_auth,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .nest("/api/student", student_api)
        .with_state(state)
}
