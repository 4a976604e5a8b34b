use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::database::{self, answers, attempts, sessions};
use crate::dto::session_dto::{
    AbandonResponse, ActiveSessionResponse, AttemptReview, AttemptSummary, OptionView,
    PaginatedAttempts, QuestionView, ReviewItem, ReviewOptionView, SavedAnswerView, SessionHandle,
    StartTestRequest, SubmitAnswerRequest, SubmitAnswerResponse, TestQuestionsResponse, TestResult,
};
use crate::error::{Error, Result};
use crate::models::answer::Answer;
use crate::models::question::Question;
use crate::models::test::TestRules;
use crate::models::test_attempt::TestAttempt;
use crate::models::test_session::{SessionStatus, TestSession};
use crate::services::access_gate::{self, SharedAccessGate};
use crate::services::answer_ledger::{AnswerLedger, Response};
use crate::services::question_bank::QuestionBank;
use crate::services::scoring_service::ScoringService;
use crate::utils::shuffle::shuffle_for_session;
use crate::utils::time;
use crate::utils::token::generate_session_token;

const QUESTION_SCOPE: &str = "questions";
const SELECTION_SCOPE: &str = "selection";

/// Drives the session lifecycle: start, serve, record, submit, abandon and expire.
#[derive(Clone)]
pub struct TestSessionService {
    pool: PgPool,
    question_bank: QuestionBank,
    access_gate: SharedAccessGate,
}

impl TestSessionService {
    pub fn new(pool: PgPool, access_gate: SharedAccessGate) -> Self {
        Self {
            question_bank: QuestionBank::new(pool.clone()),
            pool,
            access_gate,
        }
    }

    pub async fn start(
        &self,
        test_id: Uuid,
        student_id: Uuid,
        req: StartTestRequest,
    ) -> Result<SessionHandle> {
        let test = self.question_bank.find_published_test(test_id).await?;
        access_gate::ensure_access(self.access_gate.as_ref(), student_id, test_id).await?;

        let bank = self.question_bank.questions_for_test(test_id).await?;
        if bank.is_empty() {
            return Err(Error::BadRequest(
                "Test has no published questions".to_string(),
            ));
        }

        let rules = TestRules::from(&test);
        let session_token = generate_session_token();
        let questions = select_questions(
            bank,
            req.max_questions,
            rules.shuffle_questions,
            &session_token,
        );
        let marks_available = questions
            .iter()
            .map(|q| q.marks)
            .sum::<Decimal>()
            .normalize();
        let total_questions = questions.len() as i32;
        let questions_snapshot = serde_json::to_value(&questions)?;

        let now = time::now();
        let mut tx = self.pool.begin().await?;
        attempts::acquire_slot_lock(&mut *tx, test_id, student_id).await?;

        if let Some(open) = attempts::find_open(&mut *tx, test_id, student_id).await? {
            let attempt = attempts::lock_for_update(&mut *tx, open.id)
                .await?
                .ok_or(Error::SessionNotFound)?;
            match sessions::find_by_attempt(&mut *tx, attempt.id).await? {
                Some(session) if session.status.is_live() && !session.deadline_passed(now) => {
                    return Err(Error::SessionAlreadyActive);
                }
                Some(session) => {
                    let finalized = finalize_locked(&mut tx, &attempt, &session, now).await?;
                    tracing::info!(
                        attempt_id = %finalized.id,
                        %student_id,
                        "Finalized overdue attempt before starting a new one"
                    );
                }
                None => {
                    tracing::warn!(
                        attempt_id = %attempt.id,
                        "Open attempt without a session; deactivating"
                    );
                    attempts::deactivate(&mut *tx, attempt.id).await?;
                }
            }
        }

        let used = attempts::count_for(&mut *tx, test_id, student_id).await?;
        if used >= i64::from(test.max_attempts) {
            tx.commit().await?;
            return Err(Error::AttemptLimitExceeded {
                max_attempts: test.max_attempts,
            });
        }

        let attempt = attempts::insert(
            &mut *tx,
            attempts::NewAttempt {
                test_id,
                student_id,
                attempt_number: used as i32 + 1,
                started_at: now,
                total_questions,
                marks_available,
                rules: &rules,
                questions_snapshot,
            },
        )
        .await
        .map_err(already_active_on_conflict)?;

        let session = sessions::insert(
            &mut *tx,
            sessions::NewSession {
                session_id: &session_token,
                attempt_id: attempt.id,
                test_id,
                student_id,
                started_at: now,
                expires_at: time::deadline(now, rules.time_limit_minutes),
                time_remaining_seconds: rules.time_limit_seconds() as i32,
            },
        )
        .await
        .map_err(already_active_on_conflict)?;

        tx.commit().await.map_err(already_active_on_conflict)?;

        tracing::info!(
            attempt_id = %attempt.id,
            %test_id,
            %student_id,
            attempt_number = attempt.attempt_number,
            total_questions,
            "Test session started"
        );

        Ok(SessionHandle::new(&session, &attempt, now))
    }

    pub async fn get_test_questions(
        &self,
        test_id: Uuid,
        session_id: &str,
        student_id: Uuid,
    ) -> Result<TestQuestionsResponse> {
        let now = time::now();
        let mut session = self.load_session(test_id, session_id, student_id).await?;
        self.expire_if_overdue(&mut session, now).await?;
        if !session.status.serves_questions() {
            return Err(Error::SessionNotFound);
        }

        let attempt = attempts::find_by_id(&self.pool, session.attempt_id)
            .await?
            .filter(TestAttempt::is_open)
            .ok_or(Error::SessionNotFound)?;

        if session.status == SessionStatus::Started
            && sessions::mark_in_progress(&self.pool, session.id).await?
        {
            session.status = SessionStatus::InProgress;
        }

        let rules = attempt.rules();
        let questions = attempt.questions()?;
        let saved = answers::list_for_attempt(&self.pool, attempt.id).await?;

        Ok(TestQuestionsResponse {
            session_id: session.session_id.clone(),
            status: session.status,
            time_remaining_seconds: session.time_remaining(now),
            allow_skip: rules.allow_skip,
            allow_review: rules.allow_review,
            questions: build_question_views(questions, &saved, &rules, &session.session_id),
        })
    }

    pub async fn submit_answer(
        &self,
        test_id: Uuid,
        student_id: Uuid,
        req: SubmitAnswerRequest,
    ) -> Result<SubmitAnswerResponse> {
        let now = time::now();
        let mut session = self.load_session(test_id, &req.session_id, student_id).await?;
        self.expire_if_overdue(&mut session, now).await?;
        if !session.status.is_live() {
            return Err(Error::SessionNotFound);
        }

        let mut tx = self.pool.begin().await?;
        let attempt = attempts::lock_for_share(&mut *tx, session.attempt_id)
            .await?
            .filter(TestAttempt::is_open)
            .ok_or(Error::SessionNotFound)?;

        // Re-read under the attempt lock; a concurrent submit may have ended it.
        let session = sessions::find_by_attempt(&mut *tx, attempt.id)
            .await?
            .filter(|s| s.status.is_live())
            .ok_or(Error::SessionNotFound)?;
        if session.deadline_passed(now) {
            drop(tx);
            sessions::mark_expired(&self.pool, session.id).await?;
            return Err(Error::SessionExpired);
        }

        let questions = attempt.questions()?;
        let question = questions
            .iter()
            .find(|q| q.id == req.question_id)
            .ok_or(Error::QuestionNotInTest(req.question_id))?;
        let rules = attempt.rules();

        let answer = AnswerLedger::record(
            &mut tx,
            attempt.id,
            question,
            &rules,
            Response {
                selected_option_ids: &req.selected_option_ids,
                answer_text: req.answer_text.as_deref(),
                time_spent_seconds: req.time_spent_seconds,
                flagged_for_review: req.flagged_for_review,
            },
            now,
        )
        .await?;

        if session.status == SessionStatus::Started {
            sessions::mark_in_progress(&mut *tx, session.id).await?;
        }
        tx.commit().await?;

        tracing::debug!(
            attempt_id = %attempt.id,
            question_id = %answer.question_id,
            is_answered = answer.is_answered,
            "Answer recorded"
        );

        Ok(SubmitAnswerResponse {
            saved: true,
            question_id: answer.question_id,
            is_answered: answer.is_answered,
            flagged_for_review: answer.flagged_for_review,
            answered_at: answer.answered_at,
            time_remaining_seconds: time::remaining_seconds(session.expires_at, now),
        })
    }

    /// Finalizes the attempt. Repeating the call returns the stored result.
    pub async fn submit_test(
        &self,
        test_id: Uuid,
        session_id: &str,
        student_id: Uuid,
    ) -> Result<TestResult> {
        let now = time::now();
        let session = self.load_session(test_id, session_id, student_id).await?;

        let mut tx = self.pool.begin().await?;
        let attempt = attempts::lock_for_update(&mut *tx, session.attempt_id)
            .await?
            .ok_or(Error::SessionNotFound)?;

        if attempt.submitted {
            tx.commit().await?;
            return Ok(TestResult::from(&attempt));
        }
        if !attempt.active {
            return Err(Error::SessionNotFound);
        }

        let session = sessions::find_by_attempt(&mut *tx, attempt.id)
            .await?
            .ok_or(Error::SessionNotFound)?;
        let finalized = finalize_locked(&mut tx, &attempt, &session, now).await?;
        tx.commit().await?;

        tracing::info!(
            attempt_id = %finalized.id,
            %student_id,
            marks_obtained = %finalized.marks_obtained,
            percentage = %finalized.percentage,
            passed = finalized.passed,
            "Test submitted"
        );

        Ok(TestResult::from(&finalized))
    }

    pub async fn get_active_session(
        &self,
        test_id: Uuid,
        student_id: Uuid,
    ) -> Result<ActiveSessionResponse> {
        self.ensure_test_exists(test_id).await?;
        let none = ActiveSessionResponse {
            has_active_session: false,
            session: None,
            questions_answered: None,
        };

        let Some(attempt) = attempts::find_open(&self.pool, test_id, student_id).await? else {
            return Ok(none);
        };
        let Some(mut session) = sessions::find_by_attempt(&self.pool, attempt.id).await? else {
            return Ok(none);
        };

        let now = time::now();
        // An expired but unsubmitted session is still reported so the client can submit it.
        match self.expire_if_overdue(&mut session, now).await {
            Ok(()) | Err(Error::SessionExpired) => {}
            Err(e) => return Err(e),
        }
        if session.status == SessionStatus::Ended {
            return Ok(none);
        }

        let answered = answers::count_answered(&self.pool, attempt.id).await?;
        Ok(ActiveSessionResponse {
            has_active_session: true,
            session: Some(SessionHandle::new(&session, &attempt, now)),
            questions_answered: Some(answered),
        })
    }

    pub async fn abandon_session(
        &self,
        test_id: Uuid,
        student_id: Uuid,
    ) -> Result<AbandonResponse> {
        let now = time::now();
        let mut tx = self.pool.begin().await?;
        attempts::acquire_slot_lock(&mut *tx, test_id, student_id).await?;

        let open = match attempts::find_open(&mut *tx, test_id, student_id).await? {
            Some(open) => open,
            None => {
                drop(tx);
                self.ensure_test_exists(test_id).await?;
                return Err(Error::NoActiveSession);
            }
        };
        let attempt = attempts::lock_for_update(&mut *tx, open.id)
            .await?
            .filter(TestAttempt::is_open)
            .ok_or(Error::NoActiveSession)?;

        attempts::deactivate(&mut *tx, attempt.id).await?;
        if let Some(session) = sessions::find_by_attempt(&mut *tx, attempt.id).await? {
            let remaining = session.time_remaining(now) as i32;
            sessions::end(&mut *tx, session.id, now, remaining).await?;
        }
        tx.commit().await?;

        tracing::info!(
            attempt_id = %attempt.id,
            %test_id,
            %student_id,
            "Test session abandoned"
        );

        Ok(AbandonResponse {
            abandoned: true,
            attempt_id: attempt.id,
            attempt_number: attempt.attempt_number,
        })
    }

    pub async fn get_test_result(&self, attempt_id: Uuid, student_id: Uuid) -> Result<TestResult> {
        let attempt = self.load_submitted_attempt(attempt_id, student_id).await?;
        Ok(TestResult::from(&attempt))
    }

    pub async fn get_attempt_review(
        &self,
        attempt_id: Uuid,
        student_id: Uuid,
    ) -> Result<AttemptReview> {
        let attempt = self.load_submitted_attempt(attempt_id, student_id).await?;
        if !attempt.allow_review {
            return Err(Error::ReviewNotAllowed);
        }

        let deadline = sessions::find_by_attempt(&self.pool, attempt.id)
            .await?
            .map(|s| s.expires_at)
            .unwrap_or_else(|| time::deadline(attempt.started_at, attempt.time_limit_minutes));
        let saved = answers::list_for_attempt(&self.pool, attempt.id).await?;

        Ok(AttemptReview {
            result: TestResult::from(&attempt),
            questions: build_review(attempt.questions()?, &saved, deadline),
        })
    }

    pub async fn get_test_attempts(
        &self,
        test_id: Uuid,
        student_id: Uuid,
    ) -> Result<Vec<AttemptSummary>> {
        self.ensure_test_exists(test_id).await?;
        let rows = attempts::list_for_test(&self.pool, test_id, student_id).await?;
        Ok(rows.iter().map(AttemptSummary::from).collect())
    }

    pub async fn get_student_attempts(
        &self,
        student_id: Uuid,
        page: i64,
        per_page: i64,
    ) -> Result<PaginatedAttempts> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);
        let offset = page_offset(page, per_page)?;

        let total = attempts::count_for_student(&self.pool, student_id).await?;
        let rows = attempts::list_for_student(&self.pool, student_id, per_page, offset).await?;
        let total_pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };

        Ok(PaginatedAttempts {
            items: rows.iter().map(AttemptSummary::from).collect(),
            total,
            page,
            per_page,
            total_pages,
        })
    }

    /// Expires live sessions past their deadline and finalizes their attempts.
    /// Returns the number of sessions processed.
    pub async fn expire_overdue_sessions(&self, batch_size: i64) -> Result<usize> {
        let now = time::now();
        let overdue = sessions::list_overdue(&self.pool, now, batch_size).await?;
        let mut processed = 0;

        for stale in overdue {
            let mut tx = self.pool.begin().await?;
            let attempt = attempts::lock_for_update(&mut *tx, stale.attempt_id).await?;
            let Some(session) = sessions::find_by_attempt(&mut *tx, stale.attempt_id).await? else {
                continue;
            };
            if !session.status.is_live() {
                continue;
            }

            sessions::mark_expired(&mut *tx, session.id).await?;
            if let Some(attempt) = attempt.filter(TestAttempt::is_open) {
                let finalized = finalize_locked(&mut tx, &attempt, &session, now).await?;
                tracing::info!(
                    attempt_id = %finalized.id,
                    student_id = %finalized.student_id,
                    "Auto-submitted attempt after its deadline"
                );
            }
            tx.commit().await?;
            processed += 1;
        }

        Ok(processed)
    }

    async fn load_session(
        &self,
        test_id: Uuid,
        session_id: &str,
        student_id: Uuid,
    ) -> Result<TestSession> {
        let session = sessions::find_by_session_id(&self.pool, session_id)
            .await?
            .ok_or(Error::SessionNotFound)?;
        if session.student_id != student_id {
            return Err(Error::NotOwner);
        }
        if !session.belongs_to(test_id, student_id) {
            return Err(Error::SessionNotFound);
        }
        Ok(session)
    }

    /// Moves a live session past its deadline to EXPIRED. Errors with
    /// `SessionExpired` whenever the session ends up expired.
    async fn expire_if_overdue(&self, session: &mut TestSession, now: DateTime<Utc>) -> Result<()> {
        if session.status.is_live() && session.deadline_passed(now) {
            if sessions::mark_expired(&self.pool, session.id).await? {
                tracing::info!(attempt_id = %session.attempt_id, "Session expired");
            }
            session.status = SessionStatus::Expired;
            session.time_remaining_seconds = 0;
        }
        if session.status == SessionStatus::Expired {
            return Err(Error::SessionExpired);
        }
        Ok(())
    }

    async fn load_submitted_attempt(
        &self,
        attempt_id: Uuid,
        student_id: Uuid,
    ) -> Result<TestAttempt> {
        let attempt = attempts::find_by_id(&self.pool, attempt_id)
            .await?
            .ok_or(Error::NotOwner)?;
        attempt.ensure_owner(student_id)?;
        if !attempt.submitted {
            return Err(Error::AttemptNotSubmitted);
        }
        Ok(attempt)
    }

    async fn ensure_test_exists(&self, test_id: Uuid) -> Result<()> {
        if self.question_bank.test_exists(test_id).await? {
            Ok(())
        } else {
            Err(Error::TestNotFound(test_id))
        }
    }
}

/// Scores the attempt from its ledger and ends the session in the caller's
/// transaction. The attempt row must already be locked for update.
async fn finalize_locked(
    conn: &mut PgConnection,
    attempt: &TestAttempt,
    session: &TestSession,
    now: DateTime<Utc>,
) -> Result<TestAttempt> {
    let rules = attempt.rules();
    let questions = attempt.questions()?;
    let saved = answers::list_for_attempt(&mut *conn, attempt.id).await?;
    let entries = AnswerLedger::entries_for_scoring(&saved, session.expires_at);

    let summary = ScoringService::score(&entries, &questions, &rules);
    let percentage = ScoringService::percentage(summary.marks_obtained, summary.marks_available);
    let passed = ScoringService::passed(summary.marks_obtained, &rules);

    let remaining = time::remaining_seconds(session.expires_at, now) as i32;
    if session.status != SessionStatus::Ended {
        sessions::end(&mut *conn, session.id, now, remaining).await?;
    }

    let finalized = attempts::finalize(
        &mut *conn,
        attempt.id,
        attempts::FinalizeAttempt {
            summary,
            percentage,
            passed,
            submitted_at: now,
            time_taken_seconds: time::elapsed_seconds(attempt.started_at, now),
        },
    )
    .await?;

    Ok(finalized)
}

fn already_active_on_conflict(err: sqlx::Error) -> Error {
    if database::is_unique_violation(&err) {
        Error::SessionAlreadyActive
    } else {
        Error::from(err)
    }
}

/// Fixes the question set for a new attempt. With a cap, shuffled tests take a
/// per-session random subset; others take the first questions in catalogue order.
fn select_questions(
    mut bank: Vec<Question>,
    max_questions: Option<u32>,
    shuffle: bool,
    session_id: &str,
) -> Vec<Question> {
    if let Some(max) = max_questions {
        let max = max as usize;
        if max < bank.len() {
            if shuffle {
                shuffle_for_session(&mut bank, session_id, SELECTION_SCOPE);
            }
            bank.truncate(max);
        }
    }
    bank
}

fn page_offset(page: i64, per_page: i64) -> Result<i64> {
    (page - 1)
        .checked_mul(per_page)
        .ok_or_else(|| Error::BadRequest(format!("Page {} is out of range", page)))
}

fn option_scope(question_id: Uuid) -> String {
    format!("options:{}", question_id)
}

fn build_question_views(
    mut questions: Vec<Question>,
    saved: &[Answer],
    rules: &TestRules,
    session_id: &str,
) -> Vec<QuestionView> {
    if rules.shuffle_questions {
        shuffle_for_session(&mut questions, session_id, QUESTION_SCOPE);
    }
    let by_question: HashMap<Uuid, &Answer> = saved.iter().map(|a| (a.question_id, a)).collect();

    questions
        .into_iter()
        .map(|q| {
            let mut options: Vec<OptionView> = q
                .options
                .iter()
                .map(|o| OptionView {
                    id: o.id,
                    text: o.text.clone(),
                })
                .collect();
            if rules.shuffle_options {
                shuffle_for_session(&mut options, session_id, &option_scope(q.id));
            }

            QuestionView {
                id: q.id,
                question_type: q.question_type,
                saved_answer: by_question.get(&q.id).map(|a| SavedAnswerView {
                    selected_option_ids: a.selected_option_ids.clone(),
                    answer_text: a.answer_text.clone(),
                    is_answered: a.is_answered,
                    flagged_for_review: a.flagged_for_review,
                    answered_at: a.answered_at,
                }),
                text: q.text,
                marks: q.marks,
                options,
            }
        })
        .collect()
}

fn build_review(
    questions: Vec<Question>,
    saved: &[Answer],
    deadline: DateTime<Utc>,
) -> Vec<ReviewItem> {
    let by_question: HashMap<Uuid, &Answer> = saved
        .iter()
        .filter(|a| a.answered_at <= deadline)
        .map(|a| (a.question_id, a))
        .collect();

    questions
        .into_iter()
        .map(|q| {
            let answer = by_question.get(&q.id).copied();
            let selected: &[Uuid] = answer
                .map(|a| a.selected_option_ids.as_slice())
                .unwrap_or(&[]);
            ReviewItem {
                question_id: q.id,
                question_type: q.question_type,
                marks: q.marks,
                options: q
                    .options
                    .iter()
                    .map(|o| ReviewOptionView {
                        id: o.id,
                        text: o.text.clone(),
                        is_correct: o.is_correct,
                        selected: selected.contains(&o.id),
                    })
                    .collect(),
                answer_text: answer.and_then(|a| a.answer_text.clone()),
                accepted_answer: q.accepted_answer,
                is_answered: answer.map(|a| a.is_answered).unwrap_or(false),
                is_correct: answer.map(|a| a.is_correct).unwrap_or(false),
                marks_obtained: answer.map(|a| a.marks_obtained).unwrap_or(Decimal::ZERO),
                flagged_for_review: answer.map(|a| a.flagged_for_review).unwrap_or(false),
                text: q.text,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{QuestionOption, QuestionType};
    use chrono::Duration;

    fn rules(shuffle: bool) -> TestRules {
        TestRules {
            time_limit_minutes: 30,
            negative_marking: false,
            negative_marking_percentage: Decimal::ZERO,
            passing_marks: Decimal::ZERO,
            shuffle_questions: shuffle,
            shuffle_options: shuffle,
            allow_skip: true,
            allow_review: true,
        }
    }

    fn bank(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question {
                id: Uuid::new_v4(),
                question_type: QuestionType::SingleChoice,
                text: format!("question {}", i),
                marks: Decimal::ONE,
                negative_marks: None,
                accepted_answer: None,
                options: (0..4)
                    .map(|j| QuestionOption {
                        id: Uuid::new_v4(),
                        text: format!("{}-{}", i, j),
                        is_correct: j == 0,
                    })
                    .collect(),
            })
            .collect()
    }

    fn saved(question: &Question, answered_at: DateTime<Utc>) -> Answer {
        Answer {
            id: Uuid::new_v4(),
            attempt_id: Uuid::new_v4(),
            question_id: question.id,
            selected_option_ids: vec![question.options[0].id],
            answer_text: None,
            is_answered: true,
            is_correct: true,
            marks_obtained: Decimal::ONE,
            answered_at,
            time_spent_seconds: 5,
            flagged_for_review: true,
            created_at: answered_at,
            updated_at: answered_at,
        }
    }

    #[test]
    fn unshuffled_cap_takes_catalogue_prefix() {
        let questions = bank(5);
        let expected: Vec<Uuid> = questions.iter().take(3).map(|q| q.id).collect();
        let selected = select_questions(questions, Some(3), false, "s");
        assert_eq!(selected.iter().map(|q| q.id).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn cap_above_bank_size_keeps_everything() {
        let selected = select_questions(bank(4), Some(10), true, "s");
        assert_eq!(selected.len(), 4);
    }

    #[test]
    fn views_are_stable_per_session_and_hide_the_key() {
        let questions = bank(8);
        let r = rules(true);
        let first = build_question_views(questions.clone(), &[], &r, "session-a");
        let again = build_question_views(questions.clone(), &[], &r, "session-a");

        let ids = |v: &[QuestionView]| v.iter().map(|q| q.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&again));

        let json = serde_json::to_value(&first).unwrap();
        assert!(!json.to_string().contains("is_correct"));
    }

    #[test]
    fn unshuffled_views_keep_catalogue_order() {
        let questions = bank(6);
        let expected: Vec<Uuid> = questions.iter().map(|q| q.id).collect();
        let views = build_question_views(questions, &[], &rules(false), "s");
        assert_eq!(views.iter().map(|q| q.id).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn saved_answers_are_attached() {
        let questions = bank(2);
        let answer = saved(&questions[1], Utc::now());
        let views = build_question_views(questions.clone(), &[answer], &rules(false), "s");
        assert!(views[0].saved_answer.is_none());
        let restored = views[1].saved_answer.as_ref().unwrap();
        assert_eq!(restored.selected_option_ids, vec![questions[1].options[0].id]);
        assert!(restored.flagged_for_review);
    }

    #[test]
    fn page_offset_skips_whole_pages() {
        assert_eq!(page_offset(1, 20).unwrap(), 0);
        assert_eq!(page_offset(3, 20).unwrap(), 40);
    }

    #[test]
    fn page_offset_rejects_overflowing_pages() {
        let err = page_offset(i64::MAX, 100).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(err.code(), "bad_request");
    }

    #[test]
    fn review_ignores_answers_after_the_deadline() {
        let questions = bank(2);
        let deadline = Utc::now();
        let on_time = saved(&questions[0], deadline - Duration::seconds(5));
        let late = saved(&questions[1], deadline + Duration::seconds(5));

        let review = build_review(questions.clone(), &[on_time, late], deadline);
        assert!(review[0].is_answered);
        assert!(review[0].options[0].selected);
        assert!(review[0].options[0].is_correct);
        assert!(!review[1].is_answered);
        assert_eq!(review[1].marks_obtained, Decimal::ZERO);
    }
}
