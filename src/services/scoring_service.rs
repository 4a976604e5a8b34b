use std::collections::{HashMap, HashSet};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use uuid::Uuid;

use crate::models::answer::Answer;
use crate::models::question::{Question, QuestionType};
use crate::models::test::TestRules;

/// Outcome of grading one response against its question's answer key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradedAnswer {
    pub is_answered: bool,
    pub is_correct: bool,
    pub marks_obtained: Decimal,
}

/// The slice of an answer row that scoring looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    pub question_id: Uuid,
    pub is_answered: bool,
    pub is_correct: bool,
}

impl From<&Answer> for LedgerEntry {
    fn from(answer: &Answer) -> Self {
        Self {
            question_id: answer.question_id,
            is_answered: answer.is_answered,
            is_correct: answer.is_correct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreSummary {
    pub total_questions: i32,
    pub answered: i32,
    pub correct: i32,
    pub wrong: i32,
    pub unanswered: i32,
    pub marks_obtained: Decimal,
    pub marks_available: Decimal,
}

pub struct ScoringService;

impl ScoringService {
    pub fn grade_answer(
        question: &Question,
        selected_option_ids: &[Uuid],
        answer_text: Option<&str>,
        rules: &TestRules,
    ) -> GradedAnswer {
        let is_answered = match question.question_type {
            QuestionType::FreeText => answer_text.map(|t| !t.trim().is_empty()).unwrap_or(false),
            _ => !selected_option_ids.is_empty(),
        };

        if !is_answered {
            return GradedAnswer {
                is_answered: false,
                is_correct: false,
                marks_obtained: Decimal::ZERO,
            };
        }

        let is_correct = match question.question_type {
            QuestionType::SingleChoice | QuestionType::TrueFalse => {
                let correct = question.correct_option_ids();
                selected_option_ids.len() == 1
                    && correct.len() == 1
                    && selected_option_ids[0] == correct[0]
            }
            QuestionType::MultipleChoice => {
                let correct: HashSet<Uuid> = question.correct_option_ids().into_iter().collect();
                let selected: HashSet<Uuid> = selected_option_ids.iter().copied().collect();
                !correct.is_empty() && correct == selected
            }
            QuestionType::FreeText => match (&question.accepted_answer, answer_text) {
                (Some(expected), Some(given)) => normalize_text(expected) == normalize_text(given),
                _ => false,
            },
        };

        let marks_obtained = if is_correct {
            question.marks
        } else if rules.negative_marking {
            -question.effective_negative_marks(rules)
        } else {
            Decimal::ZERO
        };

        GradedAnswer {
            is_answered,
            is_correct,
            marks_obtained: marks_obtained.normalize(),
        }
    }

    /// Aggregates the ledger over the attempt's fixed question set. Entries for
    /// questions outside the set are ignored.
    pub fn score(
        entries: &[LedgerEntry],
        questions: &[Question],
        rules: &TestRules,
    ) -> ScoreSummary {
        let by_question: HashMap<Uuid, &LedgerEntry> =
            entries.iter().map(|e| (e.question_id, e)).collect();

        let mut summary = ScoreSummary {
            total_questions: questions.len() as i32,
            answered: 0,
            correct: 0,
            wrong: 0,
            unanswered: 0,
            marks_obtained: Decimal::ZERO,
            marks_available: Decimal::ZERO,
        };

        for question in questions {
            summary.marks_available += question.marks;

            match by_question.get(&question.id) {
                Some(entry) if entry.is_answered => {
                    summary.answered += 1;
                    if entry.is_correct {
                        summary.correct += 1;
                        summary.marks_obtained += question.marks;
                    } else {
                        summary.wrong += 1;
                        if rules.negative_marking {
                            summary.marks_obtained -= question.effective_negative_marks(rules);
                        }
                    }
                }
                _ => summary.unanswered += 1,
            }
        }

        summary.marks_obtained = summary.marks_obtained.normalize();
        summary.marks_available = summary.marks_available.normalize();
        summary
    }

    /// Signed percentage rounded to two places, half away from zero. The stored
    /// value is this rounded figure, not the exact quotient. Zero when nothing
    /// is available.
    pub fn percentage(marks_obtained: Decimal, marks_available: Decimal) -> Decimal {
        if marks_available <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (marks_obtained * Decimal::ONE_HUNDRED / marks_available)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
    }

    pub fn display_percentage(percentage: Decimal) -> Decimal {
        percentage.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
    }

    pub fn passed(marks_obtained: Decimal, rules: &TestRules) -> bool {
        marks_obtained >= rules.passing_marks
    }
}

fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
