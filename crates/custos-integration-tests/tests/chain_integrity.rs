//! Chain guarantees across the ingestion path and real storage backends.
//!
//! The ledger's own tests cover the verifier case by case; here the
//! events enter through the pipeline's write path and the storage is the
//! byte-level KV layer, so a rewrite behind the ledger's back is exactly
//! what a compromised storage host could attempt.

use std::sync::Arc;

use custos_crypto::KeyPair;
use custos_detect::{AlertGenerator, AlertStore, MemoryAlertStore, MemoryRuleStore, RuleEngine, RuleStore};
use custos_ledger::kv::EVENTS_NAMESPACE;
use custos_ledger::{
    ChainAppender, ChainHeadStore, ChainProblem, ChainVerifier, EventStore, KvLedgerStore,
};
use custos_notify::{DeliveryStore, Dispatcher, MemoryDeliveryStore};
use custos_pipeline::{Ingestor, LedgerHistory, Pipeline, PipelineHandle};
use custos_storage::{KvStore, MemoryKvStore, SurrealKvStore};
use custos_test::{draft_for, test_tenant};

/// A pipeline with no rules: the write path alone, detection idle.
fn spawn_quiet_pipeline<S>(
    store: Arc<S>,
    signer: Option<Arc<KeyPair>>,
) -> (Ingestor<S>, PipelineHandle)
where
    S: EventStore + ChainHeadStore + 'static,
{
    let mut appender = ChainAppender::new(Arc::clone(&store));
    if let Some(signer) = signer {
        appender = appender.with_signer(signer);
    }
    Pipeline::new(
        Arc::new(appender),
        Arc::new(MemoryRuleStore::new()) as Arc<dyn RuleStore>,
        RuleEngine::new(Arc::new(LedgerHistory::new(Arc::clone(&store)))),
        AlertGenerator::new(Arc::new(MemoryAlertStore::new()) as Arc<dyn AlertStore>),
        Arc::new(Dispatcher::new(
            Arc::new(MemoryDeliveryStore::new()) as Arc<dyn DeliveryStore>,
        )),
    )
    .spawn()
}

#[tokio::test]
async fn pipeline_commits_form_a_tamper_evident_chain() {
    let kv = Arc::new(MemoryKvStore::new());
    let store = Arc::new(KvLedgerStore::new(Arc::clone(&kv) as Arc<dyn KvStore>).unwrap());
    let (ingestor, handle) = spawn_quiet_pipeline(Arc::clone(&store), None);

    let tenant = test_tenant();
    let mut events = Vec::new();
    for i in 0..4 {
        events.push(
            ingestor
                .ingest(draft_for(&tenant, &format!("user-{i}"), "data.read"))
                .await
                .unwrap(),
        );
    }
    handle.shutdown().await;

    let verifier = ChainVerifier::new(Arc::clone(&store));
    assert!(verifier.verify(&tenant).await.unwrap().is_intact());

    // Rewrite one stored actor id behind the ledger's back.
    let key = events[1].id.to_string();
    let raw = kv.get(EVENTS_NAMESPACE, &key).await.unwrap().unwrap();
    let mut value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
    value["actor"]["id"] = serde_json::json!("mallory");
    kv.set(EVENTS_NAMESPACE, &key, serde_json::to_vec(&value).unwrap())
        .await
        .unwrap();

    let report = verifier.verify(&tenant).await.unwrap();
    assert!(!report.is_intact());
    let root = report.root_cause().unwrap();
    assert_eq!(root.sequence, 1);
    assert!(matches!(root.problems[0], ChainProblem::ContentMismatch { .. }));
}

#[tokio::test]
async fn signed_commits_verify_against_the_signing_key() {
    let keypair = Arc::new(KeyPair::generate());
    let kv = Arc::new(MemoryKvStore::new());
    let store = Arc::new(KvLedgerStore::new(Arc::clone(&kv) as Arc<dyn KvStore>).unwrap());
    let (ingestor, handle) = spawn_quiet_pipeline(Arc::clone(&store), Some(Arc::clone(&keypair)));

    let tenant = test_tenant();
    for i in 0..3 {
        ingestor
            .ingest(draft_for(&tenant, &format!("user-{i}"), "auth.login"))
            .await
            .unwrap();
    }
    handle.shutdown().await;

    let report = ChainVerifier::new(Arc::clone(&store))
        .with_trusted_key(keypair.public_key())
        .verify(&tenant)
        .await
        .unwrap();
    assert!(report.is_intact());

    // A different key rejects every signature.
    let report = ChainVerifier::new(store)
        .with_trusted_key(KeyPair::generate().public_key())
        .verify(&tenant)
        .await
        .unwrap();
    assert!(!report.is_intact());
    assert!(
        report
            .findings
            .iter()
            .all(|f| f.problems.contains(&ChainProblem::SignatureInvalid))
    );
}

#[tokio::test]
async fn chain_survives_a_store_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger");
    let tenant = test_tenant();

    {
        let kv = Arc::new(SurrealKvStore::open(&path).unwrap());
        let store = Arc::new(KvLedgerStore::new(Arc::clone(&kv) as Arc<dyn KvStore>).unwrap());
        let appender = ChainAppender::new(Arc::clone(&store));
        for i in 0..3 {
            appender
                .append(draft_for(&tenant, &format!("user-{i}"), "auth.login"))
                .await
                .unwrap();
        }
        kv.close().await.unwrap();
    }

    let kv = Arc::new(SurrealKvStore::open(&path).unwrap());
    let store = Arc::new(KvLedgerStore::new(kv as Arc<dyn KvStore>).unwrap());
    let events = store.events_in_range(&tenant, 0, None).await.unwrap();
    assert_eq!(events.len(), 3);
    assert!(
        ChainVerifier::new(store)
            .verify(&tenant)
            .await
            .unwrap()
            .is_intact()
    );
}
