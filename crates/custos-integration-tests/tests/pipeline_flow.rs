//! End-to-end flows: drafts in, chained events, alerts out the sink.
//!
//! Each test wires the full stack — ledger, detection worker, dispatcher,
//! capturing sink — and drives it only through the public write path.

mod common;

use chrono::Utc;
use common::{spawn_stack, wait_for_alerts, wait_for_terminal_deliveries};
use custos_core::{Severity, TenantId};
use custos_detect::{AlertStatus, AlertStore};
use custos_ledger::EventStore;
use custos_notify::DeliveryState;
use custos_pipeline::PipelineError;
use custos_test::{
    at_offset, draft_for, failed_login_draft, match_rule, pattern_rule, test_tenant,
    threshold_rule,
};

#[tokio::test]
async fn failed_login_raises_and_delivers_one_alert() {
    let tenant = test_tenant();
    let stack = spawn_stack(vec![match_rule(
        &tenant,
        "any failed login",
        "auth.login.failed",
    )])
    .await;

    let event = stack
        .ingestor
        .ingest(failed_login_draft(&tenant, "u1"))
        .await
        .unwrap();
    assert_eq!(event.sequence, 0);

    let alerts = wait_for_alerts(&stack.alerts, &tenant, |alerts| alerts.len() == 1).await;
    let alert = &alerts[0];
    assert!(alert.message.contains("any failed login"));
    assert_eq!(alert.severity, Severity::Medium);
    assert_eq!(alert.status, AlertStatus::Open);
    assert_eq!(alert.event_ids, vec![event.id]);
    assert_eq!(alert.trigger_count, 1);

    let records = wait_for_terminal_deliveries(&stack.deliveries, alert.id, 1).await;
    assert_eq!(records[0].sink, "capture");
    assert_eq!(records[0].state, DeliveryState::Delivered);
    assert_eq!(records[0].attempts, 1);

    let delivered = stack.sink.notifications();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].idempotency_key, alert.id);

    stack.handle.shutdown().await;
}

#[tokio::test]
async fn threshold_burst_alerts_once_then_folds() {
    let tenant = test_tenant();
    let stack = spawn_stack(vec![threshold_rule(
        &tenant,
        "login burst",
        "auth.login.failed",
        3,
        300,
    )])
    .await;

    let base = Utc::now();
    for offset in [-30, -20, -10, 0] {
        stack
            .ingestor
            .ingest(failed_login_draft(&tenant, "mallory").with_timestamp(at_offset(base, offset)))
            .await
            .unwrap();
    }

    // The third event fires the alert; the fourth folds into it.
    let alerts = wait_for_alerts(&stack.alerts, &tenant, |alerts| {
        alerts.len() == 1 && alerts[0].trigger_count == 2
    })
    .await;
    assert_eq!(alerts[0].event_ids.len(), 4);

    // Folding does not re-dispatch: one delivery record, delivered once.
    let records = wait_for_terminal_deliveries(&stack.deliveries, alerts[0].id, 1).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].state, DeliveryState::Delivered);
    assert_eq!(stack.sink.notifications().len(), 1);

    stack.handle.shutdown().await;
}

#[tokio::test]
async fn per_actor_scope_keeps_actors_separate() {
    let tenant = test_tenant();
    let stack = spawn_stack(vec![threshold_rule(
        &tenant,
        "login burst",
        "auth.login.failed",
        3,
        300,
    )])
    .await;

    let base = Utc::now();
    let mut mallory_ids = Vec::new();
    for (user, offset) in [
        ("mallory", -30),
        ("alice", -25),
        ("mallory", -20),
        ("alice", -15),
        ("mallory", -10),
    ] {
        let event = stack
            .ingestor
            .ingest(failed_login_draft(&tenant, user).with_timestamp(at_offset(base, offset)))
            .await
            .unwrap();
        if user == "mallory" {
            mallory_ids.push(event.id);
        }
    }
    stack.handle.shutdown().await;

    // Only the actor who actually crossed the threshold alerts.
    let alerts = wait_for_alerts(&stack.alerts, &tenant, |alerts| alerts.len() == 1).await;
    assert_eq!(alerts[0].event_ids, mallory_ids);
    assert_eq!(alerts[0].trigger_count, 1);
}

#[tokio::test]
async fn ordered_actions_complete_a_pattern() {
    let tenant = test_tenant();
    let stack = spawn_stack(vec![pattern_rule(
        &tenant,
        "read, export, then delete",
        &["data.read", "data.export", "data.delete"],
        900,
    )])
    .await;

    let base = Utc::now();
    let read = stack
        .ingestor
        .ingest(draft_for(&tenant, "u1", "data.read").with_timestamp(at_offset(base, -120)))
        .await
        .unwrap();
    let export = stack
        .ingestor
        .ingest(draft_for(&tenant, "u1", "data.export").with_timestamp(at_offset(base, -90)))
        .await
        .unwrap();
    // Unrelated noise between the steps must not break the sequence.
    stack
        .ingestor
        .ingest(draft_for(&tenant, "u1", "auth.login").with_timestamp(at_offset(base, -80)))
        .await
        .unwrap();
    let delete = stack
        .ingestor
        .ingest(draft_for(&tenant, "u1", "data.delete").with_timestamp(base))
        .await
        .unwrap();

    let alerts = wait_for_alerts(&stack.alerts, &tenant, |alerts| alerts.len() == 1).await;
    assert_eq!(alerts[0].event_ids, vec![read.id, export.id, delete.id]);
    assert_eq!(alerts[0].severity, Severity::Critical);

    stack.handle.shutdown().await;
}

#[tokio::test]
async fn unordered_actions_never_alert() {
    let tenant = test_tenant();
    let stack = spawn_stack(vec![pattern_rule(
        &tenant,
        "read, export, then delete",
        &["data.read", "data.export", "data.delete"],
        900,
    )])
    .await;

    let base = Utc::now();
    for (kind, offset) in [("data.delete", -120), ("data.read", -60), ("data.export", 0)] {
        stack
            .ingestor
            .ingest(draft_for(&tenant, "u1", kind).with_timestamp(at_offset(base, offset)))
            .await
            .unwrap();
    }

    // Shutdown drains the commit queue, so every event has been evaluated.
    stack.handle.shutdown().await;
    let alerts = stack.alerts.alerts_for_tenant(&tenant).await.unwrap();
    assert!(alerts.is_empty());
}

#[tokio::test]
async fn rules_do_not_cross_tenant_boundaries() {
    let acme = test_tenant();
    let globex = TenantId::new("globex");
    let stack = spawn_stack(vec![match_rule(&acme, "any failed login", "auth.login.failed")]).await;

    for user in ["u1", "u2"] {
        stack
            .ingestor
            .ingest(failed_login_draft(&globex, user))
            .await
            .unwrap();
    }
    stack.handle.shutdown().await;

    // The events chained under their own tenant, but acme's rule never saw them.
    let chained = stack.ledger.events_in_range(&globex, 0, None).await.unwrap();
    assert_eq!(chained.len(), 2);
    assert_eq!(chained[1].sequence, 1);
    assert!(stack.alerts.alerts_for_tenant(&globex).await.unwrap().is_empty());
    assert!(stack.alerts.alerts_for_tenant(&acme).await.unwrap().is_empty());
    assert!(stack.sink.notifications().is_empty());
}

#[tokio::test]
async fn a_batch_with_one_bad_draft_commits_the_rest() {
    let tenant = test_tenant();
    let stack = spawn_stack(Vec::new()).await;

    let mut bad = draft_for(&tenant, "u2", "auth.login");
    bad.actor.id = String::new();
    let batch = vec![
        draft_for(&tenant, "u1", "auth.login"),
        bad,
        draft_for(&tenant, "u3", "auth.login"),
    ];

    let report = stack.ingestor.ingest_batch(batch).await;
    assert!(!report.all_committed());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert!(matches!(
        report.failures[0].error,
        PipelineError::Validation(_)
    ));

    stack.handle.shutdown().await;
    let chained = stack.ledger.events_in_range(&tenant, 0, None).await.unwrap();
    assert_eq!(chained.len(), 2);
    assert_eq!(
        report.committed.iter().map(|e| e.sequence).collect::<Vec<_>>(),
        vec![0, 1]
    );
}
