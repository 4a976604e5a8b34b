use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionOption, QuestionOptionRow, QuestionRow};
use crate::models::test::Test;

/// Read-only access to published tests and their questions.
#[derive(Clone)]
pub struct QuestionBank {
    pool: PgPool,
}

impl QuestionBank {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_published_test(&self, test_id: Uuid) -> Result<Test> {
        sqlx::query_as::<_, Test>("SELECT * FROM tests WHERE id = $1 AND is_published = TRUE")
            .bind(test_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::TestNotFound(test_id))
    }

    pub async fn test_exists(&self, test_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tests WHERE id = $1)")
            .bind(test_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    /// Published questions in catalogue order, each with its options and answer key.
    pub async fn questions_for_test(&self, test_id: Uuid) -> Result<Vec<Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"SELECT id, question_text, question_type, marks, negative_marks, accepted_answer
               FROM questions
               WHERE test_id = $1 AND is_published = TRUE
               ORDER BY position ASC, created_at ASC, id ASC"#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let question_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let option_rows = sqlx::query_as::<_, QuestionOptionRow>(
            r#"SELECT id, question_id, option_text, is_correct
               FROM question_options
               WHERE question_id = ANY($1)
               ORDER BY position ASC, id ASC"#,
        )
        .bind(&question_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble_questions(rows, option_rows))
    }
}

fn assemble_questions(
    rows: Vec<QuestionRow>,
    option_rows: Vec<QuestionOptionRow>,
) -> Vec<Question> {
    let mut options_by_question: HashMap<Uuid, Vec<QuestionOption>> = HashMap::new();
    for opt in option_rows {
        options_by_question
            .entry(opt.question_id)
            .or_default()
            .push(QuestionOption {
                id: opt.id,
                text: opt.option_text,
                is_correct: opt.is_correct,
            });
    }

    rows.into_iter()
        .map(|row| Question {
            id: row.id,
            question_type: row.question_type,
            text: row.question_text,
            marks: row.marks,
            negative_marks: row.negative_marks,
            accepted_answer: row.accepted_answer,
            options: options_by_question.remove(&row.id).unwrap_or_default(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionType;
    use rust_decimal::Decimal;

    #[test]
    fn options_are_attached_in_row_order() {
        let q1 = Uuid::new_v4();
        let q2 = Uuid::new_v4();
        let rows = vec![
            QuestionRow {
                id: q1,
                question_text: "first".into(),
                question_type: QuestionType::SingleChoice,
                marks: Decimal::ONE,
                negative_marks: None,
                accepted_answer: None,
            },
            QuestionRow {
                id: q2,
                question_text: "second".into(),
                question_type: QuestionType::FreeText,
                marks: Decimal::TWO,
                negative_marks: None,
                accepted_answer: Some("x".into()),
            },
        ];
        let opts = vec![
            QuestionOptionRow {
                id: Uuid::new_v4(),
                question_id: q1,
                option_text: "a".into(),
                is_correct: false,
            },
            QuestionOptionRow {
                id: Uuid::new_v4(),
                question_id: q1,
                option_text: "b".into(),
                is_correct: true,
            },
        ];

        let questions = assemble_questions(rows, opts);
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].id, q1);
        let texts: Vec<&str> = questions[0].options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert!(questions[1].options.is_empty());
    }
}
