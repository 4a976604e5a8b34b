use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::time::remaining_seconds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "session_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Started,
    InProgress,
    Paused,
    Expired,
    Ended,
}

impl SessionStatus {
    /// Live sessions may still accept answers (subject to the deadline).
    pub fn is_live(self) -> bool {
        matches!(
            self,
            SessionStatus::Started | SessionStatus::InProgress | SessionStatus::Paused
        )
    }

    pub fn serves_questions(self) -> bool {
        matches!(self, SessionStatus::Started | SessionStatus::InProgress)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestSession {
    pub id: Uuid,
    pub session_id: String,
    pub attempt_id: Uuid,
    pub test_id: Uuid,
    pub student_id: Uuid,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub time_remaining_seconds: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestSession {
    pub fn deadline_passed(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn time_remaining(&self, now: DateTime<Utc>) -> i64 {
        if !self.status.is_live() {
            return 0;
        }
        remaining_seconds(self.expires_at, now)
    }

    pub fn belongs_to(&self, test_id: Uuid, student_id: Uuid) -> bool {
        self.test_id == test_id && self.student_id == student_id
    }
}
