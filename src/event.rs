//! Event records: the append-only log every dashboard number derives from.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tag classifying an operational event.
///
/// The tag set is open: the vision pipeline already emits `SYSTEM` for
/// lifecycle messages and may grow new tags without a backend deploy, so
/// unknown tags are kept verbatim in [`EventKind::Other`] instead of being
/// rejected. Tags are trimmed and uppercased on the way in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A visitor entered or left the floor.
    Visitor,
    /// A production task (a served cup) completed.
    Production,
    /// A procedure violation caught on camera.
    Violation,
    /// A staff member checked in.
    Attendance,
    /// Pipeline or backend lifecycle message.
    System,
    /// Any tag outside the known set.
    Other(String),
}

impl EventKind {
    /// The uppercase tag used on the wire and in the store.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Visitor => "VISITOR",
            Self::Production => "PRODUCTION",
            Self::Violation => "VIOLATION",
            Self::Attendance => "ATTENDANCE",
            Self::System => "SYSTEM",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for EventKind {
    fn from(tag: &str) -> Self {
        let normalized = tag.trim().to_uppercase();
        match normalized.as_str() {
            "VISITOR" => Self::Visitor,
            "PRODUCTION" => Self::Production,
            "VIOLATION" => Self::Violation,
            "ATTENDANCE" => Self::Attendance,
            "SYSTEM" => Self::System,
            _ => Self::Other(normalized),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from(tag.as_str()))
    }
}

/// A stored operational event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    /// Record id, assigned at append time.
    pub id: Uuid,
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Kind tag.
    pub event: EventKind,
    /// Free text; `PRODUCTION` entries may embed a `Durasi: {n}s` marker.
    pub detail: String,
}

/// Payload for appending an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Kind tag.
    pub event: EventKind,
    /// Free-text description.
    pub detail: String,
    /// Explicit event time; the store substitutes "now" when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewEvent {
    /// Creates a payload with the timestamp left to the store.
    pub fn new(event: EventKind, detail: impl Into<String>) -> Self {
        Self {
            event,
            detail: detail.into(),
            timestamp: None,
        }
    }

    /// Sets an explicit event time.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Timestamp/kind projection feeding the dashboard activity chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityPoint {
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Kind tag.
    pub event: EventKind,
}
