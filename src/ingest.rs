//! Write-side operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::employee::{canonical_name, EmployeePerformance};
use crate::error::{Result, TelemetryError};
use crate::event::{EventLog, NewEvent};
use crate::store::{EmployeeStore, EventStore, TelemetryStore};

/// Write facade over the store.
///
/// HTTP handlers and library callers both go through it, so names and
/// kinds are normalized exactly once, in one place.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn TelemetryStore>,
}

impl Ingestor {
    /// Wraps the given store.
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    /// Appends an event. The timestamp defaults to "now" when absent.
    pub async fn append_event(&self, event: NewEvent) -> Result<EventLog> {
        if event.event.as_str().is_empty() {
            return Err(TelemetryError::validation("event kind must not be empty"));
        }
        if event.detail.trim().is_empty() {
            return Err(TelemetryError::validation("event detail must not be empty"));
        }

        let stored = self.store.append(event).await?;
        debug!(id = %stored.id, kind = %stored.event, "event appended");
        Ok(stored)
    }

    /// Records an attendance for `name` at `seen_at`.
    ///
    /// The name is trimmed and uppercased, `last_seen` and `status` are
    /// set, and the record starts with zero cups when it is new. An
    /// existing cup count is left alone.
    pub async fn upsert_employee_attendance(
        &self,
        name: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<EmployeePerformance> {
        let canonical = canonical_name(name);
        if canonical.is_empty() {
            return Err(TelemetryError::validation("employee name must not be empty"));
        }

        let record = self.store.upsert_attendance(&canonical, seen_at).await?;
        debug!(employee = %record.name, "attendance recorded");
        Ok(record)
    }

    /// Adds `by` cups to `name`'s counter, creating the record if needed.
    pub async fn increment_cups(&self, name: &str, by: i64) -> Result<EmployeePerformance> {
        let canonical = canonical_name(name);
        if canonical.is_empty() {
            return Err(TelemetryError::validation("employee name must not be empty"));
        }

        let record = self.store.increment_cups(&canonical, by).await?;
        debug!(employee = %record.name, cups = record.cups, "cups incremented");
        Ok(record)
    }
}
