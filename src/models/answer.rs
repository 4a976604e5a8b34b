use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Answer {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub selected_option_ids: Vec<Uuid>,
    pub answer_text: Option<String>,
    pub is_answered: bool,
    pub is_correct: bool,
    pub marks_obtained: Decimal,
    pub answered_at: DateTime<Utc>,
    pub time_spent_seconds: i32,
    pub flagged_for_review: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
