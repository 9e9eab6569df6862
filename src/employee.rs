//! Per-employee performance counters.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status written by the attendance path.
pub const STATUS_ACTIVE: &str = "Active";

/// Canonical form of an employee name: trimmed and uppercased.
///
/// Every write path goes through this, so `"  budi "` and `"BUDI"` land on
/// the same record.
pub fn canonical_name(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Rolling performance record for one employee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeePerformance {
    /// Canonical uppercase name; unique per employee.
    pub name: String,
    /// Completed cups. Older records may lack the field, so
    /// deserialization defaults it to zero.
    #[serde(default)]
    pub cups: i64,
    /// Most recent attendance.
    pub last_seen: DateTime<Utc>,
    /// Free-text status label (`"Active"`, `"Idle (HP)"`, ...).
    pub status: String,
}

/// Leaderboard ordering: cups descending, ties broken by name ascending so
/// equal counts always render in the same order.
pub fn leaderboard_order(a: &EmployeePerformance, b: &EmployeePerformance) -> Ordering {
    b.cups.cmp(&a.cups).then_with(|| a.name.cmp(&b.name))
}
