//! Storage abstraction for events and employee counters.
//!
//! The engine, the ingestor and the HTTP layer all hold the store as an
//! `Arc<dyn TelemetryStore>`, so tests run against [`MemoryStore`] and
//! deployments against [`PgStore`] without either side changing.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::employee::EmployeePerformance;
use crate::error::Result;
use crate::event::{ActivityPoint, EventKind, EventLog, NewEvent};

/// Read/write access to the append-only event log.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends one event and returns the stored record. A missing
    /// timestamp is resolved to "now" by the store.
    async fn append(&self, event: NewEvent) -> Result<EventLog>;

    /// Counts events of `kind` with `timestamp >= since`; all time when
    /// `since` is `None`.
    async fn count_by_kind(&self, kind: &EventKind, since: Option<DateTime<Utc>>) -> Result<u64>;

    /// Full records of `kind` inside the window, oldest first.
    async fn events_by_kind(
        &self,
        kind: &EventKind,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<EventLog>>;

    /// Timestamp/kind projection for the given kinds inside the window,
    /// oldest first.
    async fn activity(
        &self,
        kinds: &[EventKind],
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityPoint>>;

    /// The `limit` most recent events overall, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<EventLog>>;

    /// Most recent event of `kind`, if any.
    async fn latest_by_kind(&self, kind: &EventKind) -> Result<Option<EventLog>>;
}

/// Access to per-employee performance counters.
#[async_trait]
pub trait EmployeeStore: Send + Sync {
    /// Atomically records an attendance: sets `last_seen` and `status`,
    /// creating the record with zero cups when the name is new. An
    /// existing cup count is never reset. `name` must already be
    /// canonical.
    async fn upsert_attendance(
        &self,
        name: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<EmployeePerformance>;

    /// Atomically adds `by` to the cup counter, creating the record with
    /// `cups = by` when the name is new. Concurrent calls must not lose
    /// updates.
    async fn increment_cups(&self, name: &str, by: i64) -> Result<EmployeePerformance>;

    /// Every performance record, cups descending, ties by name ascending.
    async fn leaderboard(&self) -> Result<Vec<EmployeePerformance>>;
}

/// Combined store surface the rest of the crate depends on.
#[async_trait]
pub trait TelemetryStore: EventStore + EmployeeStore {
    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> Result<()>;
}
