use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::answer::Answer;

pub struct UpsertAnswer<'a> {
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub selected_option_ids: &'a [Uuid],
    pub answer_text: Option<&'a str>,
    pub is_answered: bool,
    pub is_correct: bool,
    pub marks_obtained: Decimal,
    pub answered_at: DateTime<Utc>,
    pub time_spent_seconds: i32,
    pub flagged_for_review: bool,
}

/// Last write wins per (attempt, question).
pub async fn upsert(
    executor: impl PgExecutor<'_>,
    answer: UpsertAnswer<'_>,
) -> Result<Answer, sqlx::Error> {
    sqlx::query_as::<_, Answer>(
        r#"
        INSERT INTO test_answers (
            attempt_id, question_id, selected_option_ids, answer_text,
            is_answered, is_correct, marks_obtained, answered_at,
            time_spent_seconds, flagged_for_review
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (attempt_id, question_id) DO UPDATE
        SET selected_option_ids = EXCLUDED.selected_option_ids,
            answer_text = EXCLUDED.answer_text,
            is_answered = EXCLUDED.is_answered,
            is_correct = EXCLUDED.is_correct,
            marks_obtained = EXCLUDED.marks_obtained,
            answered_at = EXCLUDED.answered_at,
            time_spent_seconds = EXCLUDED.time_spent_seconds,
            flagged_for_review = EXCLUDED.flagged_for_review,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(answer.attempt_id)
    .bind(answer.question_id)
    .bind(answer.selected_option_ids)
    .bind(answer.answer_text)
    .bind(answer.is_answered)
    .bind(answer.is_correct)
    .bind(answer.marks_obtained)
    .bind(answer.answered_at)
    .bind(answer.time_spent_seconds)
    .bind(answer.flagged_for_review)
    .fetch_one(executor)
    .await
}

pub async fn list_for_attempt(
    executor: impl PgExecutor<'_>,
    attempt_id: Uuid,
) -> Result<Vec<Answer>, sqlx::Error> {
    sqlx::query_as::<_, Answer>("SELECT * FROM test_answers WHERE attempt_id = $1")
        .bind(attempt_id)
        .fetch_all(executor)
        .await
}

pub async fn count_answered(
    executor: impl PgExecutor<'_>,
    attempt_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM test_answers WHERE attempt_id = $1 AND is_answered")
        .bind(attempt_id)
        .fetch_one(executor)
        .await
}
