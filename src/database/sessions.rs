use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::test_session::{SessionStatus, TestSession};

pub struct NewSession<'a> {
    pub session_id: &'a str,
    pub attempt_id: Uuid,
    pub test_id: Uuid,
    pub student_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub time_remaining_seconds: i32,
}

pub async fn insert(
    executor: impl PgExecutor<'_>,
    session: NewSession<'_>,
) -> Result<TestSession, sqlx::Error> {
    sqlx::query_as::<_, TestSession>(
        r#"
        INSERT INTO test_sessions (
            session_id, attempt_id, test_id, student_id, status,
            started_at, expires_at, time_remaining_seconds
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(session.session_id)
    .bind(session.attempt_id)
    .bind(session.test_id)
    .bind(session.student_id)
    .bind(SessionStatus::Started)
    .bind(session.started_at)
    .bind(session.expires_at)
    .bind(session.time_remaining_seconds)
    .fetch_one(executor)
    .await
}

pub async fn find_by_session_id(
    executor: impl PgExecutor<'_>,
    session_id: &str,
) -> Result<Option<TestSession>, sqlx::Error> {
    sqlx::query_as::<_, TestSession>("SELECT * FROM test_sessions WHERE session_id = $1")
        .bind(session_id)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_attempt(
    executor: impl PgExecutor<'_>,
    attempt_id: Uuid,
) -> Result<Option<TestSession>, sqlx::Error> {
    sqlx::query_as::<_, TestSession>("SELECT * FROM test_sessions WHERE attempt_id = $1")
        .bind(attempt_id)
        .fetch_optional(executor)
        .await
}

/// STARTED → IN_PROGRESS. No-op for any other status.
pub async fn mark_in_progress(
    executor: impl PgExecutor<'_>,
    id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE test_sessions SET status = $2, updated_at = NOW()
           WHERE id = $1 AND status = $3"#,
    )
    .bind(id)
    .bind(SessionStatus::InProgress)
    .bind(SessionStatus::Started)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Moves a live session to EXPIRED. Returns false when it was no longer live.
pub async fn mark_expired(executor: impl PgExecutor<'_>, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"UPDATE test_sessions
           SET status = 'EXPIRED', time_remaining_seconds = 0, updated_at = NOW()
           WHERE id = $1 AND status IN ('STARTED', 'IN_PROGRESS', 'PAUSED')"#,
    )
    .bind(id)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn end(
    executor: impl PgExecutor<'_>,
    id: Uuid,
    ended_at: DateTime<Utc>,
    time_remaining_seconds: i32,
) -> Result<TestSession, sqlx::Error> {
    sqlx::query_as::<_, TestSession>(
        r#"UPDATE test_sessions
           SET status = $2, ended_at = $3, time_remaining_seconds = $4, updated_at = NOW()
           WHERE id = $1
           RETURNING *"#,
    )
    .bind(id)
    .bind(SessionStatus::Ended)
    .bind(ended_at)
    .bind(time_remaining_seconds)
    .fetch_one(executor)
    .await
}

/// Live sessions whose deadline has passed, oldest first.
pub async fn list_overdue(
    executor: impl PgExecutor<'_>,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<TestSession>, sqlx::Error> {
    sqlx::query_as::<_, TestSession>(
        r#"SELECT * FROM test_sessions
           WHERE status IN ('STARTED', 'IN_PROGRESS', 'PAUSED') AND expires_at <= $1
           ORDER BY expires_at ASC
           LIMIT $2"#,
    )
    .bind(now)
    .bind(limit)
    .fetch_all(executor)
    .await
}
