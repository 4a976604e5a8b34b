use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::database::answers::{self, UpsertAnswer};
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::question::{Question, QuestionType};
use crate::models::test::TestRules;
use crate::services::scoring_service::{LedgerEntry, ScoringService};

/// One student response as received from the client.
#[derive(Debug, Clone)]
pub struct Response<'a> {
    pub selected_option_ids: &'a [Uuid],
    pub answer_text: Option<&'a str>,
    pub time_spent_seconds: i32,
    pub flagged_for_review: bool,
}

pub struct AnswerLedger;

impl AnswerLedger {
    /// Grades the response against the question's key and upserts it. The caller
    /// must hold a lock on the owning attempt row.
    pub async fn record(
        conn: &mut PgConnection,
        attempt_id: Uuid,
        question: &Question,
        rules: &TestRules,
        response: Response<'_>,
        now: DateTime<Utc>,
    ) -> Result<Answer> {
        let selected = Self::validate_selection(question, response.selected_option_ids)?;
        let answer_text = match question.question_type {
            QuestionType::FreeText => response
                .answer_text
                .map(str::trim)
                .filter(|t| !t.is_empty()),
            _ => None,
        };

        let graded = ScoringService::grade_answer(question, &selected, answer_text, rules);
        if !graded.is_answered && !rules.allow_skip {
            return Err(Error::SkipNotAllowed);
        }

        let answer = answers::upsert(
            &mut *conn,
            UpsertAnswer {
                attempt_id,
                question_id: question.id,
                selected_option_ids: &selected,
                answer_text,
                is_answered: graded.is_answered,
                is_correct: graded.is_correct,
                marks_obtained: graded.marks_obtained,
                answered_at: now,
                time_spent_seconds: response.time_spent_seconds.max(0),
                flagged_for_review: response.flagged_for_review && rules.allow_review,
            },
        )
        .await?;

        Ok(answer)
    }

    /// Deduplicates the selection and checks it against the question's options.
    pub fn validate_selection(question: &Question, selected: &[Uuid]) -> Result<Vec<Uuid>> {
        let mut unique: Vec<Uuid> = Vec::with_capacity(selected.len());
        for id in selected {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }

        match question.question_type {
            QuestionType::FreeText => {
                if !unique.is_empty() {
                    return Err(Error::BadRequest(
                        "Free-text questions do not take option selections".to_string(),
                    ));
                }
            }
            QuestionType::SingleChoice | QuestionType::TrueFalse => {
                if unique.len() > 1 {
                    return Err(Error::BadRequest(
                        "Only one option may be selected for this question".to_string(),
                    ));
                }
            }
            QuestionType::MultipleChoice => {}
        }

        if let Some(unknown) = unique.iter().find(|id| !question.has_option(**id)) {
            return Err(Error::BadRequest(format!(
                "Option {} does not belong to question {}",
                unknown, question.id
            )));
        }

        Ok(unique)
    }

    /// Ledger entries eligible for scoring: anything recorded after the session
    /// deadline counts as unanswered.
    pub fn entries_for_scoring(answers: &[Answer], deadline: DateTime<Utc>) -> Vec<LedgerEntry> {
        answers
            .iter()
            .filter(|a| a.answered_at <= deadline)
            .map(LedgerEntry::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionOption;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn question(question_type: QuestionType) -> Question {
        Question {
            id: Uuid::new_v4(),
            question_type,
            text: "q".into(),
            marks: Decimal::ONE,
            negative_marks: None,
            accepted_answer: None,
            options: (0..3)
                .map(|i| QuestionOption {
                    id: Uuid::new_v4(),
                    text: i.to_string(),
                    is_correct: i == 0,
                })
                .collect(),
        }
    }

    fn answer(question_id: Uuid, answered_at: DateTime<Utc>) -> Answer {
        Answer {
            id: Uuid::new_v4(),
            attempt_id: Uuid::new_v4(),
            question_id,
            selected_option_ids: vec![],
            answer_text: None,
            is_answered: true,
            is_correct: true,
            marks_obtained: Decimal::ONE,
            answered_at,
            time_spent_seconds: 3,
            flagged_for_review: false,
            created_at: answered_at,
            updated_at: answered_at,
        }
    }

    #[test]
    fn duplicate_selections_collapse() {
        let q = question(QuestionType::MultipleChoice);
        let a = q.options[0].id;
        let b = q.options[1].id;
        let selected = AnswerLedger::validate_selection(&q, &[a, b, a]).unwrap();
        assert_eq!(selected, vec![a, b]);
    }

    #[test]
    fn single_choice_rejects_two_options() {
        let q = question(QuestionType::SingleChoice);
        let err = AnswerLedger::validate_selection(&q, &[q.options[0].id, q.options[1].id])
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn foreign_options_are_rejected() {
        let q = question(QuestionType::SingleChoice);
        let err = AnswerLedger::validate_selection(&q, &[Uuid::new_v4()]).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn answers_after_the_deadline_are_not_scored() {
        let deadline = Utc::now();
        let on_time = answer(Uuid::new_v4(), deadline - Duration::seconds(1));
        let at_deadline = answer(Uuid::new_v4(), deadline);
        let late = answer(Uuid::new_v4(), deadline + Duration::seconds(1));

        let entries = AnswerLedger::entries_for_scoring(
            &[on_time.clone(), at_deadline.clone(), late],
            deadline,
        );
        let ids: Vec<Uuid> = entries.iter().map(|e| e.question_id).collect();
        assert_eq!(ids, vec![on_time.question_id, at_deadline.question_id]);
    }
}
