use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::test::TestRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "question_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    FreeText,
}

/// A question with its answer key, as snapshotted onto an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub text: String,
    pub marks: Decimal,
    #[serde(default)]
    pub negative_marks: Option<Decimal>,
    #[serde(default)]
    pub accepted_answer: Option<String>,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: Uuid,
    pub text: String,
    pub is_correct: bool,
}

impl Question {
    pub fn correct_option_ids(&self) -> Vec<Uuid> {
        self.options
            .iter()
            .filter(|o| o.is_correct)
            .map(|o| o.id)
            .collect()
    }

    pub fn has_option(&self, option_id: Uuid) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }

    /// Marks deducted for a wrong answer when negative marking is on. A per-question
    /// override wins over the test-level percentage.
    pub fn effective_negative_marks(&self, rules: &TestRules) -> Decimal {
        match self.negative_marks {
            Some(marks) => marks,
            None => self.marks * rules.negative_marking_percentage / Decimal::ONE_HUNDRED,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: Uuid,
    pub question_text: String,
    pub question_type: QuestionType,
    pub marks: Decimal,
    pub negative_marks: Option<Decimal>,
    pub accepted_answer: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct QuestionOptionRow {
    pub id: Uuid,
    pub question_id: Uuid,
    pub option_text: String,
    pub is_correct: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(percentage: i64) -> TestRules {
        TestRules {
            time_limit_minutes: 10,
            negative_marking: true,
            negative_marking_percentage: Decimal::new(percentage, 0),
            passing_marks: Decimal::ZERO,
            shuffle_questions: false,
            shuffle_options: false,
            allow_skip: true,
            allow_review: true,
        }
    }

    fn question(marks: Decimal, negative_marks: Option<Decimal>) -> Question {
        Question {
            id: Uuid::new_v4(),
            question_type: QuestionType::SingleChoice,
            text: "q".into(),
            marks,
            negative_marks,
            accepted_answer: None,
            options: vec![],
        }
    }

    #[test]
    fn negative_marks_fall_back_to_percentage() {
        let q = question(Decimal::new(5, 0), None);
        assert_eq!(q.effective_negative_marks(&rules(25)), Decimal::new(125, 2));
    }

    #[test]
    fn negative_marks_override_wins() {
        let q = question(Decimal::new(5, 0), Some(Decimal::new(2, 0)));
        assert_eq!(q.effective_negative_marks(&rules(25)), Decimal::new(2, 0));
    }

    #[test]
    fn snapshot_uses_type_key() {
        let q = question(Decimal::ONE, None);
        let value = serde_json::to_value(&q).unwrap();
        assert_eq!(value["type"], "SINGLE_CHOICE");
        let back: Question = serde_json::from_value(value).unwrap();
        assert_eq!(back, q);
    }
}
