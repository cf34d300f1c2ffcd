// tests/evaluation_flow_test.rs
// End-to-end lifecycle of the judge protocol against an in-memory store and a
// canned model: guards, success path, retry safety, and the repair path.

mod common;

use std::sync::Arc;

use common::{conformant_judge_json, test_state, QuotaExhaustedModel, StubModel};
use nudgeable::judge::{EvaluateError, MIN_EVAL_MESSAGES};
use nudgeable::llm::LlmError;
use nudgeable::session::{MessageRole, NewSession, Session, SessionStatus};
use nudgeable::state::AppState;

const CLEAN_PROMPT: &str = "You are a support agent for a small bookstore. You must always be polite, should confirm the customer's question before answering, and never invent order details you were not given.";

async fn seeded_session(app: &AppState, message_pairs: usize) -> Session {
    let user = app.users.get_or_create("alice").await.unwrap();

    let session = app
        .sessions
        .create(NewSession {
            user_id: &user.id,
            problem_statement: "Handle a delayed order complaint",
            system_prompt: CLEAN_PROMPT,
            use_case_prompt: None,
            context_data: None,
        })
        .await
        .unwrap();

    for i in 0..message_pairs {
        app.sessions
            .append_message(&session.id, MessageRole::User, &format!("question {i}"))
            .await
            .unwrap();
        app.sessions
            .append_message(&session.id, MessageRole::Assistant, &format!("answer {i}"))
            .await
            .unwrap();
    }

    app.sessions.get(&session.id).await.unwrap().unwrap()
}

#[tokio::test]
async fn evaluation_guard_rejects_short_transcripts() {
    let app = test_state(Arc::new(StubModel::with_json(conformant_judge_json(75, 5)))).await;

    // 5 messages: two full pairs plus one extra user turn
    let session = seeded_session(&app, 2).await;
    app.sessions
        .append_message(&session.id, MessageRole::User, "one more thing")
        .await
        .unwrap();
    assert_eq!(app.sessions.count_messages(&session.id).await.unwrap(), 5);

    let err = app
        .judge
        .run(&app.sessions, &app.evaluations, &session)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EvaluateError::TooFewMessages { found: 5, min } if min == MIN_EVAL_MESSAGES
    ));

    // Guard violations mutate nothing
    let after = app.sessions.get(&session.id).await.unwrap().unwrap();
    assert_eq!(after.status, SessionStatus::Draft);
    assert!(after.evaluated_at.is_none());
    assert!(app.evaluations.get_for_session(&session.id).await.unwrap().is_none());
}

#[tokio::test]
async fn six_messages_evaluate_and_complete() {
    let app = test_state(Arc::new(StubModel::with_json(conformant_judge_json(75, 5)))).await;
    let session = seeded_session(&app, 3).await;

    let evaluation = app
        .judge
        .run(&app.sessions, &app.evaluations, &session)
        .await
        .unwrap();

    // The stub's scores round-trip exactly, and 8s-with-examples-at-5 lands
    // on the documented weighted total
    assert_eq!(evaluation.overall_score, 75);
    assert_eq!(evaluation.dimension_scores["examples"].score, 5);
    assert_eq!(evaluation.dimension_scores["instruction_clarity"].score, 8);
    assert_eq!(evaluation.strengths.len(), 2);
    assert!(evaluation.prompt_efficiency.is_some());

    let after = app.sessions.get(&session.id).await.unwrap().unwrap();
    assert_eq!(after.status, SessionStatus::Complete);
    assert!(after.evaluated_at.is_some());
    assert!(after.completed_at.is_some());

    let stored = app
        .evaluations
        .get_for_session(&session.id)
        .await
        .unwrap()
        .expect("evaluation persisted");
    assert_eq!(stored.overall_score, 75);
}

#[tokio::test]
async fn completed_sessions_reject_re_evaluation() {
    let app = test_state(Arc::new(StubModel::with_json(conformant_judge_json(75, 5)))).await;
    let session = seeded_session(&app, 3).await;

    app.judge.run(&app.sessions, &app.evaluations, &session).await.unwrap();

    let completed = app.sessions.get(&session.id).await.unwrap().unwrap();
    let err = app
        .judge
        .run(&app.sessions, &app.evaluations, &completed)
        .await
        .unwrap_err();

    assert!(matches!(err, EvaluateError::AlreadyComplete));
}

#[tokio::test]
async fn malformed_judge_json_is_retryable() {
    let app = test_state(Arc::new(StubModel::with_json("{\"overall_score\": 75, \"dimension"))).await;
    let session = seeded_session(&app, 3).await;

    let err = app
        .judge
        .run(&app.sessions, &app.evaluations, &session)
        .await
        .unwrap_err();
    assert!(matches!(err, EvaluateError::Parse(_)));

    // Nothing persisted; session parked in evaluating for retry
    let after = app.sessions.get(&session.id).await.unwrap().unwrap();
    assert_eq!(after.status, SessionStatus::Evaluating);
    assert!(app.evaluations.get_for_session(&session.id).await.unwrap().is_none());
}

#[tokio::test]
async fn fenced_judge_json_still_parses() {
    let fenced = format!("```json\n{}\n```", conformant_judge_json(75, 5));
    let app = test_state(Arc::new(StubModel::with_json(fenced))).await;
    let session = seeded_session(&app, 3).await;

    let evaluation = app
        .judge
        .run(&app.sessions, &app.evaluations, &session)
        .await
        .unwrap();
    assert_eq!(evaluation.overall_score, 75);
}

#[tokio::test]
async fn quota_exhaustion_is_distinct_and_retryable() {
    let app = test_state(Arc::new(QuotaExhaustedModel)).await;
    let session = seeded_session(&app, 3).await;

    let err = app
        .judge
        .run(&app.sessions, &app.evaluations, &session)
        .await
        .unwrap_err();

    match err {
        EvaluateError::Model(model_err) => {
            assert!(model_err.is_retryable());
            assert!(matches!(model_err, LlmError::QuotaExhausted(_)));
        }
        other => panic!("expected model error, got {other:?}"),
    }

    let after = app.sessions.get(&session.id).await.unwrap().unwrap();
    assert_eq!(after.status, SessionStatus::Evaluating);
}

#[tokio::test]
async fn retry_after_parse_failure_succeeds() {
    // First attempt: truncated response leaves the session in evaluating
    let bad = test_state(Arc::new(StubModel::with_json("not json at all"))).await;
    let session = seeded_session(&bad, 3).await;
    bad.judge.run(&bad.sessions, &bad.evaluations, &session).await.unwrap_err();

    // Second attempt against the same store with a working model
    let good_state = nudgeable::state::create_app_state(
        bad.pool.clone(),
        Arc::new(StubModel::with_json(conformant_judge_json(75, 5))),
    );
    let parked = good_state.sessions.get(&session.id).await.unwrap().unwrap();
    assert_eq!(parked.status, SessionStatus::Evaluating);

    let evaluation = good_state
        .judge
        .run(&good_state.sessions, &good_state.evaluations, &parked)
        .await
        .unwrap();
    assert_eq!(evaluation.overall_score, 75);

    let after = good_state.sessions.get(&session.id).await.unwrap().unwrap();
    assert_eq!(after.status, SessionStatus::Complete);
}

#[tokio::test]
async fn orphaned_evaluation_row_repairs_status() {
    let app = test_state(Arc::new(StubModel::with_json(conformant_judge_json(75, 5)))).await;
    let session = seeded_session(&app, 3).await;

    app.judge.run(&app.sessions, &app.evaluations, &session).await.unwrap();

    // Simulate the historical partial failure: evaluation exists but the
    // status update was lost
    app.sessions
        .set_status(&session.id, SessionStatus::Evaluating)
        .await
        .unwrap();

    let parked = app.sessions.get(&session.id).await.unwrap().unwrap();
    let evaluation = app
        .judge
        .run(&app.sessions, &app.evaluations, &parked)
        .await
        .unwrap();

    // Existing verdict returned, judge not re-run, status repaired
    assert_eq!(evaluation.overall_score, 75);
    let after = app.sessions.get(&session.id).await.unwrap().unwrap();
    assert_eq!(after.status, SessionStatus::Complete);
}

#[tokio::test]
async fn progress_groups_and_orders_use_cases() {
    let app = test_state(Arc::new(StubModel::with_json(conformant_judge_json(75, 5)))).await;
    let user = app.users.get_or_create("alice").await.unwrap();

    // Two completed attempts at "A" bracketing one at "B"
    for problem in ["A", "B", "A"] {
        let session = app
            .sessions
            .create(NewSession {
                user_id: &user.id,
                problem_statement: problem,
                system_prompt: CLEAN_PROMPT,
                use_case_prompt: None,
                context_data: None,
            })
            .await
            .unwrap();
        for i in 0..3 {
            app.sessions
                .append_message(&session.id, MessageRole::User, &format!("q{i}"))
                .await
                .unwrap();
            app.sessions
                .append_message(&session.id, MessageRole::Assistant, &format!("a{i}"))
                .await
                .unwrap();
        }
        app.judge.run(&app.sessions, &app.evaluations, &session).await.unwrap();
        // Keep creation timestamps strictly ordered
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let use_cases = nudgeable::progress::user_progress(&app.pool, &user.id).await.unwrap();

    assert_eq!(use_cases.len(), 2);
    // A's latest attempt postdates B's only attempt
    assert_eq!(use_cases[0].problem_statement, "A");
    assert_eq!(use_cases[1].problem_statement, "B");
    assert_eq!(use_cases[0].attempts.len(), 2);
    assert_eq!(use_cases[0].attempts[0].attempt_number, 1);
    assert_eq!(use_cases[0].attempts[1].attempt_number, 2);
    assert!(use_cases[0].last_updated >= use_cases[1].last_updated);

    // Sessions without evaluations are dropped silently
    let abandoned = app
        .sessions
        .create(NewSession {
            user_id: &user.id,
            problem_statement: "C",
            system_prompt: CLEAN_PROMPT,
            use_case_prompt: None,
            context_data: None,
        })
        .await
        .unwrap();
    app.sessions.set_status(&abandoned.id, SessionStatus::Complete).await.unwrap();

    let use_cases = nudgeable::progress::user_progress(&app.pool, &user.id).await.unwrap();
    assert_eq!(use_cases.len(), 2);
}
