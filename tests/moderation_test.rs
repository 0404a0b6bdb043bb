mod common;

use common::*;
use question_moderation::error::{AppError, FlagError, WorkflowError};
use question_moderation::services::{
    ClosedOutcome, DeliveryError, NewFlag, NotificationDispatcher, NotificationKind,
};
use question_moderation::{FlagReason, FlagStatus, LabelCatalog, Resolution};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn flag(question_id: i64, user_id: i64, reason: &str) -> NewFlag<'_> {
    NewFlag {
        question_id,
        user_id,
        reason,
        comment: None,
        attempt_id: None,
    }
}

#[tokio::test]
async fn test_end_to_end_flag_resolve_notify() {
    let notifier = Arc::new(RecordingNotifier::default());
    let env = setup(notifier.clone()).await;
    seed_basic(env.pool(), 2).await;
    let app = &env.app;

    assert_ok!(app.store().submit_flag(flag(42, 1, "wrong_answer")).await);
    assert_ok!(app.store().submit_flag(flag(42, 2, "wrong_answer")).await);

    let rollup = app.aggregator().get_rollup(42).await.unwrap().unwrap();
    assert_eq!(rollup.status, FlagStatus::Pending);
    assert_eq!(rollup.flag_count, 2);
    assert_eq!(
        app.aggregator().top_reason(42).await.unwrap(),
        Some(FlagReason::WrongAnswer)
    );

    let report = app
        .workflow()
        .resolve(42, 99, "fixed", "Corrected answer C")
        .await
        .unwrap();

    assert_eq!(report.rollup.status, FlagStatus::Resolved);
    assert_eq!(report.rollup.flag_count, 2);
    assert_eq!(report.rollup.resolution, Some(Resolution::Fixed));
    assert_eq!(report.rollup.resolved_by, Some(99));
    assert_eq!(report.rollup.resolution_feedback.as_deref(), Some("Corrected answer C"));
    assert!(report.rollup.resolved_at.is_some());
    assert_eq!(report.delivery.delivered, vec![1, 2]);
    assert!(report.delivery.is_clean());

    for user_id in [1, 2] {
        let received = notifier.sent_to(user_id);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].kind, NotificationKind::FlagResolved);
        assert_eq!(received[0].feedback, "Corrected answer C");
        assert_eq!(received[0].question_preview, "What is the capital of France?");
        assert_eq!(received[0].resolution_label, "Question fixed");
        assert!(received[0].subject.contains("Capital of France"));
    }
}

#[tokio::test]
async fn test_count_tracks_distinct_flags_while_open() {
    let env = setup(Arc::new(RecordingNotifier::default())).await;
    seed_basic(env.pool(), 5).await;
    let store = env.app.store();

    for user_id in 1..=5 {
        assert_ok!(store.submit_flag(flag(42, user_id, "ambiguous")).await);
        let rollup = env.app.aggregator().get_rollup(42).await.unwrap().unwrap();
        assert_eq!(rollup.flag_count, user_id);
    }
    assert_eq!(store.count_for_question(42).await.unwrap(), 5);
}

#[tokio::test]
async fn test_duplicate_flag_rejected_and_count_unchanged() {
    let env = setup(Arc::new(RecordingNotifier::default())).await;
    seed_basic(env.pool(), 1).await;
    let store = env.app.store();

    assert_ok!(store.submit_flag(flag(42, 1, "other")).await);
    let err = assert_err!(store.submit_flag(flag(42, 1, "wrong_answer")).await);
    assert!(matches!(
        err,
        AppError::Flag(FlagError::DuplicateFlag {
            question_id: 42,
            user_id: 1
        })
    ));

    let rollup = env.app.aggregator().get_rollup(42).await.unwrap().unwrap();
    assert_eq!(rollup.flag_count, 1);
    assert!(store.has_user_flagged(42, 1).await.unwrap());
}

#[tokio::test]
async fn test_submit_validation_errors() {
    let env = setup(Arc::new(RecordingNotifier::default())).await;
    seed_basic(env.pool(), 1).await;
    let store = env.app.store();

    let err = assert_err!(store.submit_flag(flag(42, 1, "spam")).await);
    assert!(matches!(err, AppError::Flag(FlagError::InvalidReason { .. })));

    let err = assert_err!(store.submit_flag(flag(7, 1, "other")).await);
    assert!(matches!(
        err,
        AppError::Flag(FlagError::QuestionNotFound { question_id: 7 })
    ));

    assert!(env.app.aggregator().get_rollup(42).await.unwrap().is_none());
}

#[tokio::test]
async fn test_comment_and_attempt_are_normalised() {
    let env = setup(Arc::new(RecordingNotifier::default())).await;
    seed_basic(env.pool(), 2).await;
    let store = env.app.store();

    store
        .submit_flag(NewFlag {
            question_id: 42,
            user_id: 1,
            reason: "error_statement",
            comment: Some("   "),
            attempt_id: Some(0),
        })
        .await
        .unwrap();
    store
        .submit_flag(NewFlag {
            question_id: 42,
            user_id: 2,
            reason: "other",
            comment: Some(" typo in option B "),
            attempt_id: Some(15),
        })
        .await
        .unwrap();

    let flags = store.list_flags_for_question(42).await.unwrap();
    assert_eq!(flags.len(), 2);

    let first = flags.iter().find(|f| f.flag.user_id == 1).unwrap();
    assert_eq!(first.flag.comment, None);
    assert_eq!(first.flag.attempt_id, None);
    assert_eq!(first.submitter_name, "User1 Test");

    let second = flags.iter().find(|f| f.flag.user_id == 2).unwrap();
    assert_eq!(second.flag.comment.as_deref(), Some("typo in option B"));
    assert_eq!(second.flag.attempt_id, Some(15));
}

#[tokio::test]
async fn test_count_frozen_after_resolve() {
    let env = setup(Arc::new(RecordingNotifier::default())).await;
    seed_basic(env.pool(), 3).await;
    let app = &env.app;

    app.store().submit_flag(flag(42, 1, "wrong_answer")).await.unwrap();
    app.workflow().resolve(42, 99, "fixed", "x").await.unwrap();

    // 关闭后的新举报照常记录，但不改变计数
    assert_ok!(app.store().submit_flag(flag(42, 2, "wrong_answer")).await);
    assert_ok!(app.aggregator().recount(42).await);

    let rollup = app.aggregator().get_rollup(42).await.unwrap().unwrap();
    assert_eq!(rollup.status, FlagStatus::Resolved);
    assert_eq!(rollup.flag_count, 1);
    assert_eq!(app.store().count_for_question(42).await.unwrap(), 2);
}

#[tokio::test]
async fn test_closed_rollup_cannot_be_closed_again() {
    let env = setup(Arc::new(RecordingNotifier::default())).await;
    seed_basic(env.pool(), 1).await;
    seed_question(env.pool(), 43, "Second", "text").await;
    let app = &env.app;

    app.store().submit_flag(flag(42, 1, "other")).await.unwrap();
    app.store().submit_flag(flag(43, 1, "other")).await.unwrap();

    app.workflow().dismiss(42, 99, "not an issue").await.unwrap();
    let err = assert_err!(app.workflow().resolve(42, 99, "fixed", "x").await);
    assert!(matches!(
        err,
        AppError::Workflow(WorkflowError::AlreadyClosed { question_id: 42, .. })
    ));

    app.workflow().resolve(43, 99, "no_action", "fine").await.unwrap();
    let err = assert_err!(app.workflow().dismiss(43, 99, "x").await);
    assert!(matches!(
        err,
        AppError::Workflow(WorkflowError::AlreadyClosed { question_id: 43, .. })
    ));

    let rollup = app.aggregator().get_rollup(42).await.unwrap().unwrap();
    assert_eq!(rollup.status, FlagStatus::Dismissed);
    assert_eq!(rollup.resolution, Some(Resolution::Dismissed));
    assert_eq!(rollup.resolution_feedback.as_deref(), Some("not an issue"));
}

#[tokio::test]
async fn test_transition_errors() {
    let env = setup(Arc::new(RecordingNotifier::default())).await;
    seed_basic(env.pool(), 1).await;
    let app = &env.app;

    let err = assert_err!(app.workflow().resolve(42, 99, "fixed", "x").await);
    assert!(matches!(
        err,
        AppError::Workflow(WorkflowError::RollupNotFound { question_id: 42 })
    ));
    let err = assert_err!(app.workflow().mark_reviewing(42).await);
    assert!(matches!(err, AppError::Workflow(WorkflowError::RollupNotFound { .. })));

    app.store().submit_flag(flag(42, 1, "other")).await.unwrap();

    for bad in ["dismissed", "wontfix", ""] {
        let err = assert_err!(app.workflow().resolve(42, 99, bad, "x").await);
        assert!(matches!(
            err,
            AppError::Workflow(WorkflowError::InvalidResolution { .. })
        ));
    }

    // 无效的处理结果不改变状态
    let rollup = app.aggregator().get_rollup(42).await.unwrap().unwrap();
    assert_eq!(rollup.status, FlagStatus::Pending);
}

#[tokio::test]
async fn test_mark_reviewing_only_moves_pending() {
    let env = setup(Arc::new(RecordingNotifier::default())).await;
    seed_basic(env.pool(), 1).await;
    let app = &env.app;

    app.store().submit_flag(flag(42, 1, "other")).await.unwrap();

    let rollup = app.workflow().mark_reviewing(42).await.unwrap();
    assert_eq!(rollup.status, FlagStatus::Reviewing);
    let rollup = app.workflow().mark_reviewing(42).await.unwrap();
    assert_eq!(rollup.status, FlagStatus::Reviewing);

    app.workflow().resolve(42, 99, "duplicate", "seen before").await.unwrap();
    let rollup = app.workflow().mark_reviewing(42).await.unwrap();
    assert_eq!(rollup.status, FlagStatus::Resolved);
}

#[tokio::test]
async fn test_top_reason_tie_prefers_declaration_order() {
    let env = setup(Arc::new(RecordingNotifier::default())).await;
    seed_basic(env.pool(), 4).await;
    let store = env.app.store();

    store.submit_flag(flag(42, 1, "other")).await.unwrap();
    store.submit_flag(flag(42, 2, "other")).await.unwrap();
    store.submit_flag(flag(42, 3, "ambiguous")).await.unwrap();
    store.submit_flag(flag(42, 4, "ambiguous")).await.unwrap();

    assert_eq!(
        env.app.aggregator().top_reason(42).await.unwrap(),
        Some(FlagReason::Ambiguous)
    );
    assert_eq!(env.app.aggregator().top_reason(43).await.unwrap(), None);
}

#[tokio::test]
async fn test_delivery_failure_is_isolated() {
    let notifier = Arc::new(FailingNotifier::new([2]));
    let env = setup(notifier.clone()).await;
    seed_basic(env.pool(), 3).await;
    let app = &env.app;

    for user_id in 1..=3 {
        app.store().submit_flag(flag(42, user_id, "wrong_answer")).await.unwrap();
    }

    let report = app.workflow().resolve(42, 99, "fixed", "done").await.unwrap();

    assert_eq!(report.rollup.status, FlagStatus::Resolved);
    assert_eq!(report.delivery.delivered, vec![1, 3]);
    assert_eq!(
        report.delivery.failures,
        vec![DeliveryError::Rejected {
            recipient_id: 2,
            status: 503
        }]
    );
    assert_eq!(notifier.inner.sent().len(), 2);
}

#[tokio::test]
async fn test_deleted_flagger_is_skipped() {
    let notifier = Arc::new(RecordingNotifier::default());
    let env = setup(notifier.clone()).await;
    seed_basic(env.pool(), 2).await;
    let app = &env.app;

    app.store().submit_flag(flag(42, 1, "other")).await.unwrap();
    app.store().submit_flag(flag(42, 2, "other")).await.unwrap();
    mark_user_deleted(env.pool(), 2).await;

    let report = app.workflow().dismiss(42, 99, "not a problem").await.unwrap();

    assert_eq!(report.delivery.delivered, vec![1]);
    assert_eq!(report.delivery.skipped, vec![2]);
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::FlagDismissed);
}

#[tokio::test]
async fn test_user_lookup_failure_is_isolated() {
    let notifier = Arc::new(RecordingNotifier::default());
    let env = setup(notifier.clone()).await;
    seed_basic(env.pool(), 3).await;

    for user_id in 1..=3 {
        env.app.store().submit_flag(flag(42, user_id, "other")).await.unwrap();
    }

    let dispatcher = NotificationDispatcher::new(
        env.pool().clone(),
        Arc::new(UserLookupFailingBank::new(env.pool().clone(), [1])),
        notifier.clone(),
        Arc::new(LabelCatalog::english()),
        150,
    );
    let report = dispatcher
        .notify_flaggers(42, ClosedOutcome::Resolved, "done", "Fixed")
        .await
        .unwrap();

    assert_eq!(report.delivered, vec![2, 3]);
    assert!(matches!(
        report.failures.as_slice(),
        [DeliveryError::LookupFailed { recipient_id: 1, .. }]
    ));
    assert!(notifier.sent_to(1).is_empty());
    assert_eq!(notifier.sent().len(), 2);
}

#[tokio::test]
async fn test_notification_preview_is_capped() {
    let notifier = Arc::new(RecordingNotifier::default());
    let env = setup(notifier.clone()).await;
    seed_basic(env.pool(), 1).await;
    let long_text = format!("<p>{}</p>", "Which statement is correct? ".repeat(20));
    seed_question(env.pool(), 44, "Long", &long_text).await;

    env.app.store().submit_flag(flag(44, 1, "ambiguous")).await.unwrap();
    env.app.workflow().resolve(44, 99, "no_action", "ok").await.unwrap();

    let sent = notifier.sent_to(1);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].question_preview.chars().count() <= 150);
    assert!(sent[0].question_preview.ends_with("..."));
    assert!(sent[0].question_preview.starts_with("Which statement is correct?"));
}

#[tokio::test]
async fn test_concurrent_terminal_transitions_have_one_winner() {
    let notifier = Arc::new(RecordingNotifier::default());
    let env = setup(notifier.clone()).await;
    seed_basic(env.pool(), 1).await;
    let app = &env.app;

    app.store().submit_flag(flag(42, 1, "other")).await.unwrap();

    let (resolved, dismissed) = tokio::join!(
        app.workflow().resolve(42, 98, "fixed", "first"),
        app.workflow().dismiss(42, 99, "second"),
    );

    assert!(resolved.is_ok() ^ dismissed.is_ok());
    let loser = if resolved.is_err() { resolved.err() } else { dismissed.err() };
    assert!(matches!(
        loser,
        Some(AppError::Workflow(WorkflowError::AlreadyClosed { .. }))
    ));
    assert_eq!(notifier.sent_to(1).len(), 1);
}

#[tokio::test]
async fn test_guarded_close_returns_the_closed_rollup_once() {
    let env = setup(Arc::new(RecordingNotifier::default())).await;
    seed_basic(env.pool(), 1).await;
    let aggregator = env.app.aggregator();

    assert!(aggregator
        .close(42, FlagStatus::Resolved, 99, Resolution::Fixed, "x")
        .await
        .unwrap()
        .is_none());

    env.app.store().submit_flag(flag(42, 1, "other")).await.unwrap();

    let closed = aggregator
        .close(42, FlagStatus::Dismissed, 98, Resolution::Dismissed, "not an issue")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(closed.status, FlagStatus::Dismissed);
    assert_eq!(closed.resolved_by, Some(98));
    assert_eq!(closed.resolution_feedback.as_deref(), Some("not an issue"));
    assert_eq!(closed.flag_count, 1);
    assert_eq!(aggregator.get_rollup(42).await.unwrap(), Some(closed));

    assert!(aggregator
        .close(42, FlagStatus::Resolved, 99, Resolution::Fixed, "late")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_keep_an_exact_count() {
    const FLAGGERS: i64 = 30;

    let env = Arc::new(setup_file_backed(Arc::new(RecordingNotifier::default()), 8).await);
    seed_basic(env.pool(), FLAGGERS).await;

    let handles: Vec<_> = (1..=FLAGGERS)
        .map(|user_id| {
            let env = env.clone();
            tokio::spawn(async move {
                env.app
                    .store()
                    .submit_flag(flag(42, user_id, "wrong_answer"))
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert_ok!(handle.await.unwrap());
    }

    let rollup = env.app.aggregator().get_rollup(42).await.unwrap().unwrap();
    assert_eq!(rollup.flag_count, FLAGGERS);
    assert_eq!(rollup.status, FlagStatus::Pending);
    assert_eq!(
        env.app.store().flagger_ids(42).await.unwrap(),
        (1..=FLAGGERS).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn test_erase_user_data_recounts_open_rollups() {
    let env = setup(Arc::new(RecordingNotifier::default())).await;
    seed_basic(env.pool(), 2).await;
    seed_question(env.pool(), 43, "Second", "text").await;
    let app = &env.app;

    app.store().submit_flag(flag(42, 1, "other")).await.unwrap();
    app.store().submit_flag(flag(42, 2, "other")).await.unwrap();
    app.store().submit_flag(flag(43, 1, "other")).await.unwrap();
    app.workflow().resolve(43, 99, "fixed", "x").await.unwrap();

    let affected = app.store().erase_user_data(1).await.unwrap();
    assert_eq!(affected, vec![42, 43]);

    let open = app.aggregator().get_rollup(42).await.unwrap().unwrap();
    assert_eq!(open.flag_count, 1);
    assert!(!app.store().has_user_flagged(42, 1).await.unwrap());

    // 已关闭的计数保持冻结，汇总记录不删除
    let closed = app.aggregator().get_rollup(43).await.unwrap().unwrap();
    assert_eq!(closed.flag_count, 1);
    assert_eq!(app.store().count_for_question(43).await.unwrap(), 0);

    // 最后一个举报人也删除后，汇总记录保留且计数为 0
    app.store().erase_user_data(2).await.unwrap();
    let open = app.aggregator().get_rollup(42).await.unwrap().unwrap();
    assert_eq!(open.flag_count, 0);
    assert_eq!(open.status, FlagStatus::Pending);
}

#[tokio::test]
async fn test_reviewers_alerted_and_events_audited() {
    let notifier = Arc::new(RecordingNotifier::default());
    let env = setup_with(notifier.clone(), |config| config.reviewer_ids = vec![50]).await;
    seed_basic(env.pool(), 1).await;
    seed_user(env.pool(), 50, "Rev", "Iewer").await;
    let app = &env.app;

    app.store().submit_flag(flag(42, 1, "outdated_law")).await.unwrap();

    let alerts = notifier.sent_to(50);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, NotificationKind::NewFlag);

    app.workflow().dismiss(42, 50, "law still current").await.unwrap();

    let audit = env.audit_log();
    let events: Vec<serde_json::Value> = audit
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], "flag_created");
    assert_eq!(events[0]["reason"], "outdated_law");
    assert_eq!(events[1]["event"], "flag_dismissed");
    assert_eq!(events[1]["dismissed_by"], 50);
}

#[tokio::test]
async fn test_flagged_listing_order_and_counts() {
    let env = setup(Arc::new(RecordingNotifier::default())).await;
    seed_basic(env.pool(), 3).await;
    seed_question(env.pool(), 43, "Second", "text").await;
    seed_question(env.pool(), 44, "Third", "text").await;
    let app = &env.app;

    for user_id in 1..=3 {
        app.store().submit_flag(flag(43, user_id, "other")).await.unwrap();
    }
    app.store().submit_flag(flag(42, 1, "other")).await.unwrap();
    app.store().submit_flag(flag(44, 1, "other")).await.unwrap();
    app.store().submit_flag(flag(44, 2, "other")).await.unwrap();
    app.workflow().mark_reviewing(44).await.unwrap();

    let all = app.aggregator().list_flagged_questions(None, 0, 10).await.unwrap();
    let ids: Vec<i64> = all.iter().map(|q| q.rollup.question_id).collect();
    assert_eq!(ids, vec![43, 44, 42]);
    assert_eq!(all[0].question_name, "Second");

    let reviewing = app
        .aggregator()
        .list_flagged_questions(Some(FlagStatus::Reviewing), 0, 10)
        .await
        .unwrap();
    assert_eq!(reviewing.len(), 1);
    assert_eq!(reviewing[0].rollup.question_id, 44);

    let page = app.aggregator().list_flagged_questions(None, 1, 1).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].rollup.question_id, 44);

    let counts = app.aggregator().counts_by_status().await.unwrap();
    assert_eq!(counts.all, 3);
    assert_eq!(counts.pending, 2);
    assert_eq!(counts.reviewing, 1);
    assert_eq!(counts.resolved, 0);
}

#[tokio::test]
async fn test_reconcile_repairs_stale_count() {
    let env = setup(Arc::new(RecordingNotifier::default())).await;
    seed_basic(env.pool(), 2).await;
    let app = &env.app;

    app.store().submit_flag(flag(42, 1, "other")).await.unwrap();
    app.store().submit_flag(flag(42, 2, "other")).await.unwrap();

    sqlx::query("UPDATE question_flag_status SET flag_count = 7 WHERE question_id = 42")
        .execute(env.pool())
        .await
        .unwrap();

    let counts = app.run().await.unwrap();
    assert_eq!(counts.all, 1);

    let rollup = app.aggregator().get_rollup(42).await.unwrap().unwrap();
    assert_eq!(rollup.flag_count, 2);
}
