#![allow(dead_code)]
//! Shared helpers for integration tests.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use brewsight::store::{EmployeeStore, EventStore, TelemetryStore};
use brewsight::{
    ActivityPoint, EmployeePerformance, EventKind, EventLog, NewEvent, Result, TelemetryError,
};

/// Fixed reference instant so windowing assertions stay deterministic.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Store whose every call fails, for exercising the no-partial-results
/// guarantee.
pub struct FailingStore;

fn outage<T>() -> Result<T> {
    Err(TelemetryError::store("simulated outage"))
}

#[async_trait]
impl EventStore for FailingStore {
    async fn append(&self, _event: NewEvent) -> Result<EventLog> {
        outage()
    }

    async fn count_by_kind(&self, _kind: &EventKind, _since: Option<DateTime<Utc>>) -> Result<u64> {
        outage()
    }

    async fn events_by_kind(
        &self,
        _kind: &EventKind,
        _since: Option<DateTime<Utc>>,
    ) -> Result<Vec<EventLog>> {
        outage()
    }

    async fn activity(
        &self,
        _kinds: &[EventKind],
        _since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityPoint>> {
        outage()
    }

    async fn recent(&self, _limit: usize) -> Result<Vec<EventLog>> {
        outage()
    }

    async fn latest_by_kind(&self, _kind: &EventKind) -> Result<Option<EventLog>> {
        outage()
    }
}

#[async_trait]
impl EmployeeStore for FailingStore {
    async fn upsert_attendance(
        &self,
        _name: &str,
        _seen_at: DateTime<Utc>,
    ) -> Result<EmployeePerformance> {
        outage()
    }

    async fn increment_cups(&self, _name: &str, _by: i64) -> Result<EmployeePerformance> {
        outage()
    }

    async fn leaderboard(&self) -> Result<Vec<EmployeePerformance>> {
        outage()
    }
}

#[async_trait]
impl TelemetryStore for FailingStore {
    async fn ping(&self) -> Result<()> {
        outage()
    }
}
