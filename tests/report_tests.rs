//! Aggregation behavior over the in-memory store.

mod common;

use std::sync::Arc;

use chrono::Duration;
use pretty_assertions::assert_eq;

use brewsight::{
    EventKind, Ingestor, MemoryStore, NewEvent, ReportEngine, TelemetryError, RECENT_LOG_LIMIT,
};
use common::{base_time, FailingStore};

#[tokio::test]
async fn summary_aggregates_kpis_and_leaderboard() {
    let store = Arc::new(MemoryStore::new());
    let ingest = Ingestor::new(store.clone());

    ingest.increment_cups("budi", 5).await.unwrap();
    ingest.increment_cups("siti", 3).await.unwrap();

    for (offset, detail) in [
        (10, "BUDI selesai kopi (Durasi: 30s)"),
        (20, "SITI selesai kopi (Durasi: 60s)"),
        (30, "no match here"),
    ] {
        ingest
            .append_event(
                NewEvent::new(EventKind::Production, detail)
                    .at(base_time() + Duration::minutes(offset)),
            )
            .await
            .unwrap();
    }
    for offset in [5, 6] {
        ingest
            .append_event(
                NewEvent::new(EventKind::Visitor, "visitor in")
                    .at(base_time() + Duration::minutes(offset)),
            )
            .await
            .unwrap();
    }
    ingest
        .append_event(
            NewEvent::new(EventKind::Violation, "no gloves")
                .at(base_time() + Duration::minutes(7)),
        )
        .await
        .unwrap();

    let engine = ReportEngine::new(store);
    let report = engine.compute_summary(None).await.unwrap();

    assert_eq!(report.kpi.total_cups, 8);
    assert_eq!(report.kpi.total_visitors, 2);
    assert_eq!(report.kpi.violations, 1);
    // only the two parseable production durations count: (30 + 60) / 2
    assert_eq!(report.kpi.avg_speed, 45);

    let names: Vec<&str> = report.leaderboard.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["BUDI", "SITI"]);

    // visitor + production points only, oldest first
    assert_eq!(report.hourly_activity.len(), 5);
    assert_eq!(report.hourly_activity[0].event, EventKind::Visitor);
    assert_eq!(
        report.hourly_activity.last().unwrap().event,
        EventKind::Production
    );

    assert_eq!(report.recent_logs.len(), 6);
    assert_eq!(report.recent_logs[0].detail, "no match here");
}

#[tokio::test]
async fn window_excludes_older_events() {
    let store = Arc::new(MemoryStore::new());
    let ingest = Ingestor::new(store.clone());

    ingest
        .append_event(NewEvent::new(EventKind::Visitor, "early visitor").at(base_time()))
        .await
        .unwrap();
    ingest
        .append_event(
            NewEvent::new(EventKind::Visitor, "late visitor")
                .at(base_time() + Duration::minutes(120)),
        )
        .await
        .unwrap();
    ingest
        .append_event(NewEvent::new(EventKind::Production, "Durasi: 100s").at(base_time()))
        .await
        .unwrap();
    ingest
        .append_event(
            NewEvent::new(EventKind::Production, "Durasi: 40s")
                .at(base_time() + Duration::minutes(130)),
        )
        .await
        .unwrap();
    ingest
        .append_event(NewEvent::new(EventKind::Violation, "early violation").at(base_time()))
        .await
        .unwrap();

    let engine = ReportEngine::new(store);
    let cutoff = base_time() + Duration::minutes(60);
    let report = engine.compute_summary(Some(cutoff)).await.unwrap();

    assert_eq!(report.kpi.total_visitors, 1);
    assert_eq!(report.kpi.violations, 0);
    assert_eq!(report.kpi.avg_speed, 40);
    assert_eq!(report.hourly_activity.len(), 2);
    // the recent feed ignores the window
    assert_eq!(report.recent_logs.len(), 5);
}

#[tokio::test]
async fn avg_speed_is_zero_when_nothing_parses() {
    let store = Arc::new(MemoryStore::new());
    let ingest = Ingestor::new(store.clone());

    for detail in ["grinder jammed", "machine cleaned"] {
        ingest
            .append_event(NewEvent::new(EventKind::Production, detail).at(base_time()))
            .await
            .unwrap();
    }

    let report = ReportEngine::new(store)
        .compute_summary(None)
        .await
        .unwrap();
    assert_eq!(report.kpi.avg_speed, 0);
}

#[tokio::test]
async fn summary_survives_maximal_ingested_durations() {
    let store = Arc::new(MemoryStore::new());
    let ingest = Ingestor::new(store.clone());

    // the marker grammar puts no ceiling on the digits, so ingestion can
    // feed the average u64::MAX twice over
    for offset in [1, 2] {
        ingest
            .append_event(
                NewEvent::new(
                    EventKind::Production,
                    format!("mesin uji selesai (Durasi: {}s)", u64::MAX),
                )
                .at(base_time() + Duration::minutes(offset)),
            )
            .await
            .unwrap();
    }

    let report = ReportEngine::new(store)
        .compute_summary(None)
        .await
        .unwrap();
    assert_eq!(report.kpi.avg_speed, u64::MAX);
}

#[tokio::test]
async fn recent_logs_cap_at_limit_and_ignore_window() {
    let store = Arc::new(MemoryStore::new());
    let ingest = Ingestor::new(store.clone());

    for i in 0..60i64 {
        ingest
            .append_event(
                NewEvent::new(EventKind::System, format!("tick {i}"))
                    .at(base_time() + Duration::seconds(i)),
            )
            .await
            .unwrap();
    }

    let engine = ReportEngine::new(store);
    let cutoff = base_time() + Duration::hours(1);
    let report = engine.compute_summary(Some(cutoff)).await.unwrap();

    assert_eq!(report.recent_logs.len(), RECENT_LOG_LIMIT);
    assert_eq!(report.recent_logs[0].detail, "tick 59");
    assert_eq!(report.kpi.total_visitors, 0);
    assert_eq!(report.kpi.avg_speed, 0);
    assert!(report.hourly_activity.is_empty());
}

#[tokio::test]
async fn leaderboard_ties_resolve_by_name() {
    let store = Arc::new(MemoryStore::new());
    let ingest = Ingestor::new(store.clone());

    for name in ["citra", "andi", "budi"] {
        ingest.increment_cups(name, 4).await.unwrap();
    }

    let report = ReportEngine::new(store)
        .compute_summary(None)
        .await
        .unwrap();
    let names: Vec<&str> = report.leaderboard.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["ANDI", "BUDI", "CITRA"]);
}

#[tokio::test]
async fn store_failure_yields_no_partial_report() {
    let engine = ReportEngine::new(Arc::new(FailingStore));
    let err = engine.compute_summary(None).await.unwrap_err();
    assert!(matches!(err, TelemetryError::StoreUnavailable(_)));
}

#[tokio::test]
async fn report_serializes_with_wire_shape() {
    let store = Arc::new(MemoryStore::new());
    let ingest = Ingestor::new(store.clone());
    ingest.increment_cups("budi", 1).await.unwrap();
    ingest
        .append_event(NewEvent::new(EventKind::Visitor, "visitor in").at(base_time()))
        .await
        .unwrap();

    let report = ReportEngine::new(store)
        .compute_summary(None)
        .await
        .unwrap();
    let value = serde_json::to_value(&report).unwrap();

    assert!(value["kpi"]["total_cups"].is_i64());
    assert!(value["kpi"]["total_visitors"].is_u64());
    assert!(value["kpi"]["avg_speed"].is_u64());
    assert!(value["kpi"]["violations"].is_u64());
    assert!(value["leaderboard"].is_array());
    assert!(value["hourly_activity"].is_array());
    assert!(value["recent_logs"].is_array());
}
