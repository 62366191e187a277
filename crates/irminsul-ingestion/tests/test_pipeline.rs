//! End-to-end runs over a scripted transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use irminsul_common::{EntityKind, TransportError};
use irminsul_config::{CatalogConfig, Config, ScraperConfig};
use irminsul_ingestion::{
    AbortReason, Catalog, FailureStage, LanceRecordStore, MemoryRecordStore, PersistedRecord,
    RecordStore, ScrapeOrchestrator, StatusBoard, StoreError, TargetStatus,
};
use irminsul_test_utils::fixtures::{unrecognizable_page, CharacterPage, MonsterPage, WeaponPage};
use irminsul_test_utils::ScriptedTransport;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

const BASE: &str = "https://wiki.biligame.com/ys";

fn config() -> Config {
    Config {
        scraper: ScraperConfig {
            requests_per_second: 1000.0,
            min_delay_secs: 0.0,
            max_delay_secs: 0.0,
            max_retries: 2,
            retry_delay_secs: 1.0,
            ..ScraperConfig::default()
        },
        ..Config::default()
    }
}

fn url(key: &str) -> String {
    Catalog::new(BASE, CatalogConfig::default()).unwrap().locator_for(key)
}

fn keys(list: &[&str]) -> Option<Vec<String>> {
    Some(list.iter().map(|k| k.to_string()).collect())
}

fn orchestrator(
    config: &Config,
    transport: &Arc<ScriptedTransport>,
    store: Arc<dyn RecordStore>,
) -> ScrapeOrchestrator {
    ScrapeOrchestrator::from_config(config, transport.clone(), store).unwrap()
}

fn alpha(base_attack: i64) -> String {
    WeaponPage::new("Alpha").rarity(5).base_attack(base_attack).render()
}

#[tokio::test(start_paused = true)]
async fn weapon_alpha_created_then_skipped_then_updated() {
    let transport = Arc::new(ScriptedTransport::new().respond(&url("Alpha"), 200, alpha(46)));
    let store = Arc::new(MemoryRecordStore::new());
    let orch = orchestrator(&config(), &transport, store.clone());

    let report = orch.run(EntityKind::Weapon, keys(&["Alpha"]), CancellationToken::new()).await.unwrap();
    assert_eq!(report.outcome.created, 1);
    let stored = store.get(EntityKind::Weapon, "Alpha").unwrap();
    assert_eq!(stored.attributes.get("rarity"), Some(&json!(5)));
    assert_eq!(stored.attributes.get("base_attack"), Some(&json!(46)));

    let report = orch.run(EntityKind::Weapon, keys(&["Alpha"]), CancellationToken::new()).await.unwrap();
    assert_eq!(report.outcome.skipped, 1);
    assert_eq!(store.writes(), 1);

    transport.set_page(&url("Alpha"), 200, alpha(48));
    let report = orch.run(EntityKind::Weapon, keys(&["Alpha"]), CancellationToken::new()).await.unwrap();
    assert_eq!(report.outcome.updated, 1);
    let stored = store.get(EntityKind::Weapon, "Alpha").unwrap();
    assert_eq!(stored.attributes.get("base_attack"), Some(&json!(48)));
    assert_eq!(stored.attributes.get("rarity"), Some(&json!(5)));
}

#[tokio::test(start_paused = true)]
async fn one_malformed_document_does_not_affect_the_batch() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond(&url("Alpha"), 200, alpha(46))
            .respond(&url("Beta"), 200, unrecognizable_page())
            .respond(&url("Gamma"), 200, WeaponPage::new("Gamma").rarity(4).render()),
    );
    let store = Arc::new(MemoryRecordStore::new());
    store
        .create(EntityKind::Weapon, "Gamma", json!({"rarity": 3}).as_object().cloned().unwrap())
        .await
        .unwrap();
    let orch = orchestrator(&config(), &transport, store.clone());

    let report = orch
        .run(EntityKind::Weapon, keys(&["Alpha", "Beta", "Gamma"]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.outcome.created, 1);
    assert_eq!(report.outcome.updated, 1);
    assert_eq!(report.outcome.errors, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].natural_key, "Beta");
    assert_eq!(report.failures[0].stage, FailureStage::Extract);
    assert!(store.get(EntityKind::Weapon, "Beta").is_none());
}

#[tokio::test(start_paused = true)]
async fn exhausted_fetch_is_an_error_and_the_run_continues() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond(&url("Alpha"), 503, "")
            .respond(&url("Beta"), 200, WeaponPage::new("Beta").rarity(4).render()),
    );
    let orch = orchestrator(&config(), &transport, Arc::new(MemoryRecordStore::new()));

    let report = orch
        .run(EntityKind::Weapon, keys(&["Alpha", "Beta"]), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.outcome.errors, 1);
    assert_eq!(report.outcome.created, 1);
    assert_eq!(report.failures[0].stage, FailureStage::Fetch);
    assert_eq!(transport.calls_to(&url("Alpha")), 2);
    assert_eq!((report.fetch.attempts, report.fetch.successes, report.fetch.failures), (3, 1, 2));
}

#[tokio::test(start_paused = true)]
async fn transient_failure_recovers_on_retry() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .fail(&url("Alpha"), TransportError::Timeout)
            .respond(&url("Alpha"), 200, alpha(46)),
    );
    let orch = orchestrator(&config(), &transport, Arc::new(MemoryRecordStore::new()));

    let report = orch.run(EntityKind::Weapon, keys(&["Alpha"]), CancellationToken::new()).await.unwrap();
    assert_eq!(report.outcome.created, 1);
    assert_eq!(report.outcome.errors, 0);
    assert_eq!(report.fetch.attempts, 2);
    assert_eq!(report.fetch.success_rate, 50.0);
}

#[tokio::test(start_paused = true)]
async fn empty_extraction_is_skipped_not_failed() {
    let transport = Arc::new(
        ScriptedTransport::new().respond(&url("Alpha"), 200, irminsul_test_utils::fixtures::blank_page()),
    );
    let store = Arc::new(MemoryRecordStore::new());
    let orch = orchestrator(&config(), &transport, store.clone());

    let report = orch.run(EntityKind::Weapon, keys(&["Alpha"]), CancellationToken::new()).await.unwrap();
    assert_eq!(report.outcome.skipped, 1);
    assert!(store.is_empty());
}

#[tokio::test(start_paused = true)]
async fn traveler_gets_documented_defaults() {
    let page = CharacterPage::new("旅行者").weapon_type("单手剑").rarity(5).render();
    let transport = Arc::new(ScriptedTransport::new().respond(&url("旅行者"), 200, page));
    let store = Arc::new(MemoryRecordStore::new());
    let orch = orchestrator(&config(), &transport, store.clone());

    let report = orch.run(EntityKind::Character, keys(&["旅行者"]), CancellationToken::new()).await.unwrap();
    assert_eq!(report.outcome.created, 1);

    let stored = store.get(EntityKind::Character, "旅行者").unwrap();
    assert_eq!(stored.attributes.get("element"), Some(&json!("Anemo")));
    assert_eq!(stored.attributes.get("region"), Some(&json!("Other")));
    assert_eq!(stored.attributes.get("weapon_type"), Some(&json!("Sword")));
}

#[tokio::test(start_paused = true)]
async fn catalog_override_is_used_when_no_keys_given() {
    let mut cfg = config();
    cfg.catalog.weapons = Some(vec!["Alpha".to_string()]);
    let transport = Arc::new(ScriptedTransport::new().respond(&url("Alpha"), 200, alpha(46)));
    let orch = orchestrator(&cfg, &transport, Arc::new(MemoryRecordStore::new()));

    let report = orch.run(EntityKind::Weapon, None, CancellationToken::new()).await.unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(transport.total_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_touches_nothing() {
    let transport = Arc::new(ScriptedTransport::new().respond(&url("Alpha"), 200, alpha(46)));
    let orch = orchestrator(&config(), &transport, Arc::new(MemoryRecordStore::new()));

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = orch.run(EntityKind::Weapon, keys(&["Alpha", "Beta"]), cancel).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.attempted, 0);
    assert_eq!(report.outcome.total(), 0);
    assert_eq!(transport.total_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_mid_run_keeps_completed_targets() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_latency(Duration::from_secs(5))
            .respond(&url("Alpha"), 200, alpha(46))
            .respond(&url("Beta"), 200, WeaponPage::new("Beta").rarity(4).render())
            .respond(&url("Gamma"), 200, WeaponPage::new("Gamma").rarity(4).render()),
    );
    let store = Arc::new(MemoryRecordStore::new());
    let (tx, mut rx) = tokio::sync::broadcast::channel(16);
    let orch = orchestrator(&config(), &transport, store.clone()).with_progress(tx);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if rx.recv().await.is_ok() {
            trigger.cancel();
        }
    });

    let report = orch
        .run(EntityKind::Weapon, keys(&["Alpha", "Beta", "Gamma"]), cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.outcome.created, 1);
    assert_eq!(report.attempted, 1);
    assert!(store.get(EntityKind::Weapon, "Alpha").is_some());
    assert!(store.get(EntityKind::Weapon, "Gamma").is_none());
}

#[tokio::test(start_paused = true)]
async fn progress_event_after_each_target() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond(&url("Alpha"), 200, alpha(46))
            .respond(&url("Beta"), 404, ""),
    );
    let (tx, mut rx) = tokio::sync::broadcast::channel(16);
    let orch = orchestrator(&config(), &transport, Arc::new(MemoryRecordStore::new())).with_progress(tx);

    let report = orch
        .run(EntityKind::Weapon, keys(&["Alpha", "Beta"]), CancellationToken::new())
        .await
        .unwrap();

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!(first.run_id, report.run_id);
    assert_eq!((first.natural_key.as_str(), first.stage), ("Alpha", TargetStatus::Created));
    assert_eq!((second.natural_key.as_str(), second.stage), ("Beta", TargetStatus::Failed));
    assert_eq!(second.outcome_so_far.total(), 2);
}

#[tokio::test(start_paused = true)]
async fn bounded_pool_processes_every_target() {
    let mut cfg = config();
    cfg.scraper.concurrency = 4;
    let names: Vec<String> = (0..12).map(|i| format!("W{i}")).collect();
    let mut transport = ScriptedTransport::new().with_latency(Duration::from_millis(200));
    for name in &names {
        transport = transport.respond(&url(name), 200, WeaponPage::new(name).rarity(4).render());
    }
    let transport = Arc::new(transport);
    let store = Arc::new(MemoryRecordStore::new());
    let orch = orchestrator(&cfg, &transport, store.clone());

    let report = orch.run(EntityKind::Weapon, Some(names.clone()), CancellationToken::new()).await.unwrap();
    assert_eq!(report.outcome.created, 12);
    assert_eq!(report.attempted, 12);
    assert_eq!(store.len(), 12);
}

#[tokio::test(start_paused = true)]
async fn concurrent_run_of_same_kind_is_refused() {
    let transport = Arc::new(ScriptedTransport::new());
    let board = StatusBoard::new();
    let orch = orchestrator(&config(), &transport, Arc::new(MemoryRecordStore::new()))
        .with_status_board(board.clone());

    let _held = board.try_begin(EntityKind::Weapon).unwrap();
    let err = orch.run(EntityKind::Weapon, keys(&["Alpha"]), CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.reason, AbortReason::AlreadyRunning(EntityKind::Weapon));
    assert_eq!(transport.total_calls(), 0);

    // A different kind is unaffected.
    assert!(orch.run(EntityKind::Monster, Some(vec![]), CancellationToken::new()).await.is_ok());
}

// ── Store failures ───────────────────────────────────────────────────────────

/// Fails every call with a fixed error.
struct BrokenStore(StoreError);

#[async_trait]
impl RecordStore for BrokenStore {
    async fn find_by_natural_key(&self, _: EntityKind, _: &str) -> Result<Option<PersistedRecord>, StoreError> {
        match &self.0 {
            StoreError::Conflict(_) => Ok(None),
            other => Err(other.clone()),
        }
    }

    async fn create(&self, _: EntityKind, _: &str, _: Map<String, Value>) -> Result<PersistedRecord, StoreError> {
        Err(self.0.clone())
    }

    async fn update(&self, _: EntityKind, _: &str, _: Map<String, Value>) -> Result<PersistedRecord, StoreError> {
        Err(self.0.clone())
    }
}

#[tokio::test(start_paused = true)]
async fn unavailable_store_aborts_the_run() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond(&url("Alpha"), 200, alpha(46))
            .respond(&url("Beta"), 200, alpha(46)),
    );
    let board = StatusBoard::new();
    let store = Arc::new(BrokenStore(StoreError::Unavailable("connection refused".into())));
    let orch = orchestrator(&config(), &transport, store).with_status_board(board.clone());

    let err = orch
        .run(EntityKind::Weapon, keys(&["Alpha", "Beta"]), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err.reason, AbortReason::Infrastructure(_)));
    assert_eq!(err.partial.attempted, 1);
    assert_eq!(err.partial.outcome.errors, 1);
    assert_eq!(transport.calls_to(&url("Beta")), 0);

    let status = board.status(EntityKind::Weapon);
    assert!(!status.is_running);
    assert_eq!(status.last_report.map(|r| r.attempted), Some(1));
}

#[tokio::test(start_paused = true)]
async fn store_conflict_is_a_per_record_error() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .respond(&url("Alpha"), 200, alpha(46))
            .respond(&url("Beta"), 200, alpha(46)),
    );
    let store = Arc::new(BrokenStore(StoreError::Conflict("unique natural_key".into())));
    let orch = orchestrator(&config(), &transport, store);

    let report = orch
        .run(EntityKind::Weapon, keys(&["Alpha", "Beta"]), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.outcome.errors, 2);
    assert!(report.failures.iter().all(|f| f.stage == FailureStage::Sync));
}

#[tokio::test(start_paused = true)]
async fn negative_resistance_is_stored_with_its_sign() {
    let page = MonsterPage::new()
        .category("精英")
        .level(90)
        .resistance("火", "-20%")
        .resistance("岩", "50%")
        .render();
    let transport = Arc::new(ScriptedTransport::new().respond(&url("丘丘岩盔王"), 200, page));
    let store = Arc::new(MemoryRecordStore::new());
    let orch = orchestrator(&config(), &transport, store.clone());

    let report = orch.run(EntityKind::Monster, keys(&["丘丘岩盔王"]), CancellationToken::new()).await.unwrap();
    assert_eq!(report.outcome.created, 1);

    let stored = store.get(EntityKind::Monster, "丘丘岩盔王").unwrap();
    assert_eq!(stored.attributes.get("resistances"), Some(&json!({"Pyro": -20.0, "Geo": 50.0})));
    assert_eq!(stored.attributes.get("level"), Some(&json!(90)));
}

// ── LanceDB ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn lancedb_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("irminsul.lancedb");
    let store = Arc::new(LanceRecordStore::open(path.to_str().unwrap()).await.unwrap());

    let mut cfg = config();
    cfg.scraper.retry_delay_secs = 0.0;
    let transport = Arc::new(ScriptedTransport::new().respond(&url("Alpha"), 200, alpha(46)));
    let orch = orchestrator(&cfg, &transport, store.clone());

    let first = orch.run(EntityKind::Weapon, keys(&["Alpha"]), CancellationToken::new()).await.unwrap();
    assert_eq!(first.outcome.created, 1);

    let second = orch.run(EntityKind::Weapon, keys(&["Alpha"]), CancellationToken::new()).await.unwrap();
    assert_eq!(second.outcome.skipped, 1);

    transport.set_page(&url("Alpha"), 200, alpha(48));
    let third = orch.run(EntityKind::Weapon, keys(&["Alpha"]), CancellationToken::new()).await.unwrap();
    assert_eq!(third.outcome.updated, 1);

    let stored = store.find_by_natural_key(EntityKind::Weapon, "Alpha").await.unwrap().unwrap();
    assert_eq!(stored.attributes.get("base_attack"), Some(&json!(48)));
    assert_eq!(stored.attributes.get("rarity"), Some(&json!(5)));
    assert!(stored.updated_at >= stored.created_at);
}
