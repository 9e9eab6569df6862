//! In-memory store for tests and database-less runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::employee::{leaderboard_order, EmployeePerformance, STATUS_ACTIVE};
use crate::error::Result;
use crate::event::{ActivityPoint, EventKind, EventLog, NewEvent};
use crate::store::{EmployeeStore, EventStore, TelemetryStore};

/// Process-local store. All state sits behind one `RwLock`, so concurrent
/// cup increments serialize instead of losing updates.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    events: Vec<EventLog>,
    employees: HashMap<String, EmployeePerformance>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn in_window(timestamp: DateTime<Utc>, since: Option<DateTime<Utc>>) -> bool {
    since.map_or(true, |cutoff| timestamp >= cutoff)
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn append(&self, event: NewEvent) -> Result<EventLog> {
        let record = EventLog {
            id: Uuid::new_v4(),
            timestamp: event.timestamp.unwrap_or_else(Utc::now),
            event: event.event,
            detail: event.detail,
        };
        self.inner.write().events.push(record.clone());
        Ok(record)
    }

    async fn count_by_kind(&self, kind: &EventKind, since: Option<DateTime<Utc>>) -> Result<u64> {
        let inner = self.inner.read();
        let count = inner
            .events
            .iter()
            .filter(|e| &e.event == kind && in_window(e.timestamp, since))
            .count();
        Ok(count as u64)
    }

    async fn events_by_kind(
        &self,
        kind: &EventKind,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<EventLog>> {
        let inner = self.inner.read();
        let mut records: Vec<EventLog> = inner
            .events
            .iter()
            .filter(|e| &e.event == kind && in_window(e.timestamp, since))
            .cloned()
            .collect();
        records.sort_by_key(|e| e.timestamp);
        Ok(records)
    }

    async fn activity(
        &self,
        kinds: &[EventKind],
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityPoint>> {
        let inner = self.inner.read();
        let mut points: Vec<ActivityPoint> = inner
            .events
            .iter()
            .filter(|e| kinds.contains(&e.event) && in_window(e.timestamp, since))
            .map(|e| ActivityPoint {
                timestamp: e.timestamp,
                event: e.event.clone(),
            })
            .collect();
        points.sort_by_key(|p| p.timestamp);
        Ok(points)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<EventLog>> {
        let inner = self.inner.read();
        let mut records: Vec<EventLog> = inner.events.clone();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }

    async fn latest_by_kind(&self, kind: &EventKind) -> Result<Option<EventLog>> {
        let inner = self.inner.read();
        let latest = inner
            .events
            .iter()
            .filter(|e| &e.event == kind)
            .max_by_key(|e| e.timestamp)
            .cloned();
        Ok(latest)
    }
}

#[async_trait]
impl EmployeeStore for MemoryStore {
    async fn upsert_attendance(
        &self,
        name: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<EmployeePerformance> {
        let mut inner = self.inner.write();
        let record = inner
            .employees
            .entry(name.to_string())
            .or_insert_with(|| EmployeePerformance {
                name: name.to_string(),
                cups: 0,
                last_seen: seen_at,
                status: STATUS_ACTIVE.to_string(),
            });
        record.last_seen = seen_at;
        record.status = STATUS_ACTIVE.to_string();
        Ok(record.clone())
    }

    async fn increment_cups(&self, name: &str, by: i64) -> Result<EmployeePerformance> {
        let mut inner = self.inner.write();
        let record = inner
            .employees
            .entry(name.to_string())
            .or_insert_with(|| EmployeePerformance {
                name: name.to_string(),
                cups: 0,
                last_seen: Utc::now(),
                status: STATUS_ACTIVE.to_string(),
            });
        record.cups += by;
        Ok(record.clone())
    }

    async fn leaderboard(&self) -> Result<Vec<EmployeePerformance>> {
        let inner = self.inner.read();
        let mut records: Vec<EmployeePerformance> = inner.employees.values().cloned().collect();
        records.sort_by(leaderboard_order);
        Ok(records)
    }
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
