//! Integration tests for aura-core
//!
//! These tests exercise the full log → refresh → explain → chat workflow
//! against a JSON records file and the mock language model.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use aura_core::{
    AnalysisManager, Capability, ChatRole, ChatState, HealthSnapshot, InsightCategory,
    JsonFileRecordStore, MockBackend, ModelClient, Priority, PromptLibrary, Record, RecordStore,
    StaticProfile, WeatherSnapshot,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
}

fn weather(pressure: f64) -> WeatherSnapshot {
    WeatherSnapshot {
        pressure_hpa: pressure,
        temperature_celsius: 15.0,
        humidity_percent: 50.0,
        condition: "clear".to_string(),
    }
}

fn water(liters: f64) -> HealthSnapshot {
    HealthSnapshot {
        water_liters: Some(liters),
        ..Default::default()
    }
}

/// Five records in the last 14 days, two in the 14 days before
fn scenario_records() -> Vec<Record> {
    let day = |n: i64| now() - Duration::days(n);
    vec![
        Record::new(1, day(1), 7, 5)
            .with_weather(weather(1005.0))
            .with_health(water(1.0)),
        Record::new(2, day(3), 8, 6)
            .with_weather(weather(1006.0))
            .with_health(water(1.1)),
        Record::new(3, day(5), 3, 2)
            .with_weather(weather(1012.0))
            .with_health(water(1.3)),
        Record::new(4, day(7), 2, 2)
            .with_weather(weather(1015.0))
            .with_health(water(0.8)),
        Record::new(5, day(9), 6, 4).with_weather(weather(1008.0)),
        Record::new(6, day(17), 4, 3),
        Record::new(7, day(24), 4, 3),
    ]
}

fn open_store(dir: &tempfile::TempDir) -> Arc<JsonFileRecordStore> {
    let store = JsonFileRecordStore::open(dir.path().join("records.json"))
        .expect("Failed to open records file");
    for record in scenario_records() {
        store.insert(record).expect("Failed to insert record");
    }
    Arc::new(store)
}

fn manager(store: Arc<JsonFileRecordStore>, mock: MockBackend) -> Arc<AnalysisManager> {
    Arc::new(
        AnalysisManager::new(
            store,
            Arc::new(StaticProfile::none()),
            Capability::new(Some(ModelClient::Mock(mock))),
        )
        .with_prompts(PromptLibrary::embedded_only()),
    )
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test]
async fn test_refresh_scenarios() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(open_store(&dir), MockBackend::new());

    let snapshot = manager.refresh(now()).await;
    assert!(snapshot.errors.is_empty());

    let frequency = snapshot
        .insights
        .iter()
        .find(|i| i.category == InsightCategory::TrendFrequency)
        .expect("frequency trend");
    assert_eq!(frequency.priority, Priority::High);
    assert_eq!(frequency.tag("pct").unwrap().to_string(), "150");
    assert_eq!(frequency.tag("direction").unwrap().to_string(), "increased");

    let hydration = snapshot
        .insights
        .iter()
        .find(|i| i.category == InsightCategory::IntakeHydration)
        .expect("hydration insight");
    assert_eq!(hydration.priority, Priority::High);
    let avg = hydration.tag("avgLiters").unwrap().as_f64().unwrap();
    assert!((avg - 1.05).abs() < 1e-9);

    let pressure = snapshot
        .insights
        .iter()
        .find(|i| i.category == InsightCategory::WeatherAssociation)
        .expect("pressure insight");
    assert_eq!(pressure.priority, Priority::Medium);
    assert_eq!(pressure.tag("lowPressureAvgPain").unwrap().as_f64(), Some(7.0));
    assert_eq!(pressure.tag("highPressureAvgPain").unwrap().as_f64(), Some(2.5));

    // High before medium before low
    let ranks: Vec<_> = snapshot.insights.iter().map(|i| i.priority.rank()).collect();
    assert!(ranks.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_refresh_publishes_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(open_store(&dir), MockBackend::new());
    let mut updates = manager.subscribe();

    let snapshot = manager.refresh(now()).await;
    updates.changed().await.unwrap();
    assert_eq!(*updates.borrow_and_update(), snapshot);
}

// =============================================================================
// Record created → explanation → write-back
// =============================================================================

#[tokio::test]
async fn test_created_record_is_explained_and_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let mock = MockBackend::new().with_reply("Low pressure days stand out in your log.");
    let manager = manager(store.clone(), mock.clone());
    manager.refresh(now()).await;

    let listener = manager.spawn_record_listener();
    let mut updates = manager.subscribe();

    let record = Record::new(8, now(), 7, 6)
        .with_weather(weather(1003.0))
        .with_note("Started at lunch");
    store.insert(record).unwrap();

    tokio::time::timeout(
        StdDuration::from_secs(5),
        updates.wait_for(|s| s.guidance_cached == 1 && s.generation_in_flight.is_none()),
    )
    .await
    .expect("explanation in time")
    .unwrap();

    let reopened = JsonFileRecordStore::open(dir.path().join("records.json")).unwrap();
    let saved = reopened.list_records().unwrap();
    assert_eq!(
        saved.iter().find(|r| r.id == 8).unwrap().explanation.as_deref(),
        Some("Low pressure days stand out in your log.")
    );
    assert!(mock.prompts()[0].contains("Note from the person: Started at lunch"));

    // The explanation stays first across refreshes
    let snapshot = manager.refresh(now()).await;
    assert_eq!(snapshot.insights[0].category, InsightCategory::Generative);
    assert_eq!(snapshot.insights[0].dedupe_key, "generative:record-8");

    listener.abort();
}

// =============================================================================
// Counselor chat
// =============================================================================

#[tokio::test]
async fn test_chat_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockBackend::new();
    let manager = manager(open_store(&dir), mock.clone());

    let greeting = manager.start_chat().await;
    assert!(greeting.contains("7 most recent"));

    let transcript = manager.chat_transcript().await;
    assert_eq!(transcript.first().unwrap().role, ChatRole::System);
    assert_eq!(transcript.last().unwrap().role, ChatRole::Assistant);

    let reply = manager.send_chat("Is pressure a factor?").await;
    assert_eq!(reply, "Mock reply to: Is pressure a factor?");
    assert_eq!(manager.chat_transcript().await.len(), transcript.len() + 2);

    manager.reset_chat().await;
    assert_eq!(manager.chat_state().await, ChatState::Inactive);
}
