use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::test::TestRules;
use crate::models::test_attempt::TestAttempt;
use crate::services::scoring_service::ScoreSummary;

pub struct NewAttempt<'a> {
    pub test_id: Uuid,
    pub student_id: Uuid,
    pub attempt_number: i32,
    pub started_at: DateTime<Utc>,
    pub total_questions: i32,
    pub marks_available: Decimal,
    pub rules: &'a TestRules,
    pub questions_snapshot: JsonValue,
}

pub struct FinalizeAttempt {
    pub summary: ScoreSummary,
    pub percentage: Decimal,
    pub passed: bool,
    pub submitted_at: DateTime<Utc>,
    pub time_taken_seconds: i32,
}

/// Serializes `start` calls for one (test, student) pair until the surrounding
/// transaction ends.
pub async fn acquire_slot_lock(
    executor: impl PgExecutor<'_>,
    test_id: Uuid,
    student_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("test_attempt:{}:{}", test_id, student_id))
        .execute(executor)
        .await?;
    Ok(())
}

pub async fn find_open(
    executor: impl PgExecutor<'_>,
    test_id: Uuid,
    student_id: Uuid,
) -> Result<Option<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(
        r#"SELECT * FROM test_attempts
           WHERE test_id = $1 AND student_id = $2 AND submitted = FALSE AND active = TRUE"#,
    )
    .bind(test_id)
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub async fn count_for(
    executor: impl PgExecutor<'_>,
    test_id: Uuid,
    student_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM test_attempts WHERE test_id = $1 AND student_id = $2")
        .bind(test_id)
        .bind(student_id)
        .fetch_one(executor)
        .await
}

pub async fn insert(
    executor: impl PgExecutor<'_>,
    attempt: NewAttempt<'_>,
) -> Result<TestAttempt, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(
        r#"
        INSERT INTO test_attempts (
            test_id, student_id, attempt_number, started_at,
            total_questions, unanswered_questions, marks_available,
            time_limit_minutes, negative_marking, negative_marking_percentage, passing_marks,
            shuffle_questions, shuffle_options, allow_skip, allow_review,
            questions_snapshot
        ) VALUES (
            $1, $2, $3, $4,
            $5, $5, $6,
            $7, $8, $9, $10,
            $11, $12, $13, $14,
            $15
        )
        RETURNING *
        "#,
    )
    .bind(attempt.test_id)
    .bind(attempt.student_id)
    .bind(attempt.attempt_number)
    .bind(attempt.started_at)
    .bind(attempt.total_questions)
    .bind(attempt.marks_available)
    .bind(attempt.rules.time_limit_minutes)
    .bind(attempt.rules.negative_marking)
    .bind(attempt.rules.negative_marking_percentage)
    .bind(attempt.rules.passing_marks)
    .bind(attempt.rules.shuffle_questions)
    .bind(attempt.rules.shuffle_options)
    .bind(attempt.rules.allow_skip)
    .bind(attempt.rules.allow_review)
    .bind(attempt.questions_snapshot)
    .fetch_one(executor)
    .await
}

pub async fn find_by_id(
    executor: impl PgExecutor<'_>,
    attempt_id: Uuid,
) -> Result<Option<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>("SELECT * FROM test_attempts WHERE id = $1")
        .bind(attempt_id)
        .fetch_optional(executor)
        .await
}

/// Exclusive row lock; taken by the finalizing submit and by abandon.
pub async fn lock_for_update(
    executor: impl PgExecutor<'_>,
    attempt_id: Uuid,
) -> Result<Option<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>("SELECT * FROM test_attempts WHERE id = $1 FOR UPDATE")
        .bind(attempt_id)
        .fetch_optional(executor)
        .await
}

/// Shared row lock; answer upserts hold it so they cannot interleave with a submit.
pub async fn lock_for_share(
    executor: impl PgExecutor<'_>,
    attempt_id: Uuid,
) -> Result<Option<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>("SELECT * FROM test_attempts WHERE id = $1 FOR SHARE")
        .bind(attempt_id)
        .fetch_optional(executor)
        .await
}

pub async fn finalize(
    executor: impl PgExecutor<'_>,
    attempt_id: Uuid,
    result: FinalizeAttempt,
) -> Result<TestAttempt, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(
        r#"
        UPDATE test_attempts
        SET submitted = TRUE,
            submitted_at = $2,
            time_taken_seconds = $3,
            total_questions = $4,
            answered_questions = $5,
            correct_answers = $6,
            wrong_answers = $7,
            unanswered_questions = $8,
            marks_obtained = $9,
            marks_available = $10,
            percentage = $11,
            passed = $12,
            updated_at = NOW()
        WHERE id = $1 AND submitted = FALSE
        RETURNING *
        "#,
    )
    .bind(attempt_id)
    .bind(result.submitted_at)
    .bind(result.time_taken_seconds)
    .bind(result.summary.total_questions)
    .bind(result.summary.answered)
    .bind(result.summary.correct)
    .bind(result.summary.wrong)
    .bind(result.summary.unanswered)
    .bind(result.summary.marks_obtained)
    .bind(result.summary.marks_available)
    .bind(result.percentage)
    .bind(result.passed)
    .fetch_one(executor)
    .await
}

pub async fn deactivate(
    executor: impl PgExecutor<'_>,
    attempt_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE test_attempts SET active = FALSE, updated_at = NOW() WHERE id = $1 AND submitted = FALSE",
    )
    .bind(attempt_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn list_for_test(
    pool: &PgPool,
    test_id: Uuid,
    student_id: Uuid,
) -> Result<Vec<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(
        r#"SELECT * FROM test_attempts
           WHERE test_id = $1 AND student_id = $2
           ORDER BY attempt_number DESC"#,
    )
    .bind(test_id)
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub async fn list_for_student(
    pool: &PgPool,
    student_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<TestAttempt>, sqlx::Error> {
    sqlx::query_as::<_, TestAttempt>(
        r#"SELECT * FROM test_attempts
           WHERE student_id = $1
           ORDER BY started_at DESC, attempt_number DESC
           LIMIT $2 OFFSET $3"#,
    )
    .bind(student_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn count_for_student(pool: &PgPool, student_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM test_attempts WHERE student_id = $1")
        .bind(student_id)
        .fetch_one(pool)
        .await
}
