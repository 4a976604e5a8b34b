use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::models::test::TestRules;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestAttempt {
    pub id: Uuid,
    pub test_id: Uuid,
    pub student_id: Uuid,
    pub attempt_number: i32,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub time_taken_seconds: Option<i32>,
    pub total_questions: i32,
    pub answered_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub unanswered_questions: i32,
    pub marks_obtained: Decimal,
    pub marks_available: Decimal,
    pub percentage: Decimal,
    pub passed: bool,
    pub submitted: bool,
    pub active: bool,
    pub time_limit_minutes: i32,
    pub negative_marking: bool,
    pub negative_marking_percentage: Decimal,
    pub passing_marks: Decimal,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    pub allow_skip: bool,
    pub allow_review: bool,
    pub questions_snapshot: JsonValue,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestAttempt {
    /// Open means it still occupies the single active slot for (test, student).
    pub fn is_open(&self) -> bool {
        !self.submitted && self.active
    }

    pub fn rules(&self) -> TestRules {
        TestRules {
            time_limit_minutes: self.time_limit_minutes,
            negative_marking: self.negative_marking,
            negative_marking_percentage: self.negative_marking_percentage,
            passing_marks: self.passing_marks,
            shuffle_questions: self.shuffle_questions,
            shuffle_options: self.shuffle_options,
            allow_skip: self.allow_skip,
            allow_review: self.allow_review,
        }
    }

    pub fn questions(&self) -> Result<Vec<Question>> {
        serde_json::from_value(self.questions_snapshot.clone()).map_err(|e| {
            Error::Internal(format!(
                "Corrupt question snapshot on attempt {}: {}",
                self.id, e
            ))
        })
    }

    pub fn ensure_owner(&self, student_id: Uuid) -> Result<()> {
        if self.student_id != student_id {
            return Err(Error::NotOwner);
        }
        Ok(())
    }
}
