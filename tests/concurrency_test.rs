mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{grant_access, rewind_session, seed_test, send, setup, TestFixture};

#[tokio::test]
async fn parallel_starts_open_exactly_one_attempt() {
    let Some(app) = setup().await else { return };
    let student = Uuid::new_v4();
    let (test_id, _) = seed_test(
        &app.pool,
        TestFixture {
            max_attempts: 10,
            ..TestFixture::default()
        },
    )
    .await;
    grant_access(&app.pool, student, test_id).await;

    let uri = format!("/api/student/tests/{}/start", test_id);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let router = app.router.clone();
        let uri = uri.clone();
        handles.push(tokio::spawn(async move {
            send(&router, "POST", &uri, Some(student), None).await
        }));
    }

    let mut ok = 0;
    for handle in handles {
        let (status, body) = handle.await.expect("join");
        if status == StatusCode::OK {
            ok += 1;
        } else {
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(body["error"], "session_already_active");
        }
    }
    assert_eq!(ok, 1);

    let open: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM test_attempts WHERE test_id = $1 AND student_id = $2 AND NOT submitted AND active",
    )
    .bind(test_id)
    .bind(student)
    .fetch_one(&app.pool)
    .await
    .expect("count");
    assert_eq!(open, 1);
}

#[tokio::test]
async fn concurrent_submits_return_the_same_result() {
    let Some(app) = setup().await else { return };
    let student = Uuid::new_v4();
    let (test_id, questions) = seed_test(&app.pool, TestFixture::default()).await;
    grant_access(&app.pool, student, test_id).await;

    let (_, handle) = send(
        &app.router,
        "POST",
        &format!("/api/student/tests/{}/start", test_id),
        Some(student),
        None,
    )
    .await;
    let session_id = handle["session_id"].as_str().unwrap().to_string();
    send(
        &app.router,
        "POST",
        &format!("/api/student/tests/{}/submit-answer", test_id),
        Some(student),
        Some(json!({
            "session_id": session_id,
            "question_id": questions[0].id,
            "selected_option_ids": [questions[0].correct_option]
        })),
    )
    .await;

    let uri = format!("/api/student/tests/{}/submit?session_id={}", test_id, session_id);
    let (a, b) = tokio::join!(
        send(&app.router, "POST", &uri, Some(student), None),
        send(&app.router, "POST", &uri, Some(student), None),
    );
    assert_eq!(a.0, StatusCode::OK);
    assert_eq!(b.0, StatusCode::OK);
    assert_eq!(a.1, b.1);
    assert_eq!(a.1["correct_answers"], 1);
}

#[tokio::test]
async fn sweep_finalizes_overdue_sessions() {
    let Some(app) = setup().await else { return };
    let student = Uuid::new_v4();
    let (test_id, questions) = seed_test(
        &app.pool,
        TestFixture {
            time_limit_minutes: 1,
            ..TestFixture::default()
        },
    )
    .await;
    grant_access(&app.pool, student, test_id).await;

    let (_, handle) = send(
        &app.router,
        "POST",
        &format!("/api/student/tests/{}/start", test_id),
        Some(student),
        None,
    )
    .await;
    let session_id = handle["session_id"].as_str().unwrap().to_string();
    send(
        &app.router,
        "POST",
        &format!("/api/student/tests/{}/submit-answer", test_id),
        Some(student),
        Some(json!({
            "session_id": session_id,
            "question_id": questions[0].id,
            "selected_option_ids": [questions[0].correct_option]
        })),
    )
    .await;
    rewind_session(&app.pool, &session_id, 120).await;

    app.state
        .session_service
        .expire_overdue_sessions(1000)
        .await
        .expect("sweep");

    let (status, attempts) = send(
        &app.router,
        "GET",
        &format!("/api/student/tests/{}/attempts", test_id),
        Some(student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let attempt = &attempts[0];
    assert_eq!(attempt["submitted"], true);
    assert_eq!(attempt["result"]["correct_answers"], 1);

    let (status, result) = send(
        &app.router,
        "POST",
        &format!("/api/student/tests/{}/submit?session_id={}", test_id, session_id),
        Some(student),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["attempt_id"], attempt["attempt_id"]);
}
