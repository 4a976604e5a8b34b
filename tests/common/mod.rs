#![allow(dead_code)]

use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use exam_session_engine::{
    config::init_config,
    database::pool::{create_pool, run_migrations},
    middleware::auth::Claims,
    router, AppState,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "session_engine_test_secret";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub pool: PgPool,
}

/// Builds the app against `DATABASE_URL`. Returns `None` when no database is configured.
pub async fn setup() -> Option<TestApp> {
    dotenvy::dotenv().ok();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set; skipping database-backed test");
        return None;
    }
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("JWT_SECRET", JWT_SECRET);
    env::set_var("STUDENT_RPS", "10000");
    env::set_var("EXPIRY_SWEEP_INTERVAL_SECS", "0");
    env::remove_var("ACCESS_GATE_URL");
    let _ = init_config();

    let pool = create_pool().await.expect("pool");
    run_migrations(&pool).await.expect("migrations");
    let state = AppState::new(pool.clone()).expect("state");

    Some(TestApp {
        router: router(state.clone(), 10_000),
        state,
        pool,
    })
}

pub struct TestFixture {
    pub time_limit_minutes: i32,
    pub max_attempts: i32,
    pub negative_marking: bool,
    pub negative_marking_percentage: Decimal,
    pub passing_marks: Decimal,
    pub shuffle: bool,
    pub allow_skip: bool,
    pub allow_review: bool,
    pub question_count: usize,
    pub marks_per_question: Decimal,
}

impl Default for TestFixture {
    fn default() -> Self {
        Self {
            time_limit_minutes: 30,
            max_attempts: 3,
            negative_marking: false,
            negative_marking_percentage: Decimal::ZERO,
            passing_marks: Decimal::ZERO,
            shuffle: false,
            allow_skip: true,
            allow_review: true,
            question_count: 2,
            marks_per_question: Decimal::ONE,
        }
    }
}

pub struct SeededQuestion {
    pub id: Uuid,
    pub correct_option: Uuid,
    pub wrong_option: Uuid,
}

/// Inserts a published test of single-choice questions; option 0 is always correct.
pub async fn seed_test(pool: &PgPool, fixture: TestFixture) -> (Uuid, Vec<SeededQuestion>) {
    let total = fixture.marks_per_question * Decimal::from(fixture.question_count as i64);
    let test_id: Uuid = sqlx::query_scalar(
        r#"INSERT INTO tests (
               title, time_limit_minutes, max_attempts, negative_marking,
               negative_marking_percentage, passing_marks, total_marks,
               shuffle_questions, shuffle_options, allow_skip, allow_review, is_published
           ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $9, $10, TRUE)
           RETURNING id"#,
    )
    .bind(format!("Session test {}", Uuid::new_v4()))
    .bind(fixture.time_limit_minutes)
    .bind(fixture.max_attempts)
    .bind(fixture.negative_marking)
    .bind(fixture.negative_marking_percentage)
    .bind(fixture.passing_marks)
    .bind(total)
    .bind(fixture.shuffle)
    .bind(fixture.allow_skip)
    .bind(fixture.allow_review)
    .fetch_one(pool)
    .await
    .expect("seed test");

    let mut questions = Vec::new();
    for position in 0..fixture.question_count {
        let question_id: Uuid = sqlx::query_scalar(
            r#"INSERT INTO questions (test_id, position, question_text, question_type, marks)
               VALUES ($1, $2, $3, 'SINGLE_CHOICE', $4)
               RETURNING id"#,
        )
        .bind(test_id)
        .bind(position as i32)
        .bind(format!("Question {}", position + 1))
        .bind(fixture.marks_per_question)
        .fetch_one(pool)
        .await
        .expect("seed question");

        let mut option_ids = Vec::new();
        for option in 0..4 {
            let option_id: Uuid = sqlx::query_scalar(
                r#"INSERT INTO question_options (question_id, position, option_text, is_correct)
                   VALUES ($1, $2, $3, $4)
                   RETURNING id"#,
            )
            .bind(question_id)
            .bind(option)
            .bind(format!("Option {}", option))
            .bind(option == 0)
            .fetch_one(pool)
            .await
            .expect("seed option");
            option_ids.push(option_id);
        }

        questions.push(SeededQuestion {
            id: question_id,
            correct_option: option_ids[0],
            wrong_option: option_ids[1],
        });
    }

    (test_id, questions)
}

pub async fn grant_access(pool: &PgPool, student_id: Uuid, test_id: Uuid) {
    sqlx::query("INSERT INTO test_access_grants (student_id, test_id) VALUES ($1, $2)")
        .bind(student_id)
        .bind(test_id)
        .execute(pool)
        .await
        .expect("grant access");
}

/// Shifts a session's clock back so that its deadline has already passed.
pub async fn rewind_session(pool: &PgPool, session_id: &str, seconds: i64) {
    let attempt_id: Uuid = sqlx::query_scalar(
        r#"UPDATE test_sessions
           SET started_at = started_at - make_interval(secs => $2),
               expires_at = expires_at - make_interval(secs => $2)
           WHERE session_id = $1
           RETURNING attempt_id"#,
    )
    .bind(session_id)
    .bind(seconds as f64)
    .fetch_one(pool)
    .await
    .expect("rewind session");

    sqlx::query(
        "UPDATE test_attempts SET started_at = started_at - make_interval(secs => $2) WHERE id = $1",
    )
    .bind(attempt_id)
    .bind(seconds as f64)
    .execute(pool)
    .await
    .expect("rewind attempt");

    sqlx::query(
        "UPDATE test_answers SET answered_at = answered_at - make_interval(secs => $2) WHERE attempt_id = $1",
    )
    .bind(attempt_id)
    .bind(seconds as f64)
    .execute(pool)
    .await
    .expect("rewind answers");
}

pub fn bearer(student_id: Uuid) -> String {
    let claims = Claims {
        sub: student_id.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        role: Some("student".to_string()),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("token");
    format!("Bearer {}", token)
}

pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    student_id: Option<Uuid>,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(student) = student_id {
        builder = builder.header("authorization", bearer(student));
    }
    let req = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let resp = router.clone().oneshot(req).await.expect("response");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
    };
    (status, json)
}

pub fn decimal(value: &JsonValue) -> Decimal {
    match value {
        JsonValue::String(s) => s.parse().expect("decimal string"),
        JsonValue::Number(n) => n.to_string().parse().expect("decimal number"),
        other => panic!("not a decimal: {}", other),
    }
}
