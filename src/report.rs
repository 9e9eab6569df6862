//! Dashboard aggregation.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::duration::{extract_duration_secs, mean_rounded};
use crate::employee::EmployeePerformance;
use crate::error::{Result, TelemetryError};
use crate::event::{ActivityPoint, EventKind, EventLog};
use crate::store::{EmployeeStore, EventStore, TelemetryStore};

/// Number of entries in the dashboard's recent-event feed.
pub const RECENT_LOG_LIMIT: usize = 50;

/// Headline numbers for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    /// Total cups across all employees.
    pub total_cups: i64,
    /// Visitor events inside the window.
    pub total_visitors: u64,
    /// Mean production duration in seconds, rounded half-up; zero when no
    /// production record carries a parseable duration.
    pub avg_speed: u64,
    /// Violation events inside the window.
    pub violations: u64,
}

/// Everything the dashboard renders, in one payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    /// Headline numbers.
    pub kpi: KpiSummary,
    /// All employees, cups descending, ties by name ascending.
    pub leaderboard: Vec<EmployeePerformance>,
    /// Visitor and production points for the activity chart.
    pub hourly_activity: Vec<ActivityPoint>,
    /// The latest [`RECENT_LOG_LIMIT`] events, regardless of window.
    pub recent_logs: Vec<EventLog>,
}

/// Reporting window selected at deploy time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowMode {
    /// No lower bound; every stored event counts.
    #[default]
    AllTime,
    /// Events since local midnight.
    Today,
}

impl WindowMode {
    /// Concrete lower bound for the given wall-clock instant, in UTC.
    ///
    /// The engine never reads the clock itself; callers resolve the mode
    /// against "now" and pass the result into
    /// [`ReportEngine::compute_summary`]. In zones where a DST jump lands
    /// on midnight, the day starts at the first valid local instant after
    /// it rather than widening to all time.
    pub fn window_start(&self, now: DateTime<Local>) -> Option<DateTime<Utc>> {
        match self {
            Self::AllTime => None,
            Self::Today => day_start(now).map(|local| local.with_timezone(&Utc)),
        }
    }
}

/// First valid instant of `now`'s calendar day in its own timezone.
///
/// Usually plain midnight; when the zone skips midnight the scan walks
/// forward a minute at a time until the gap ends.
fn day_start<Tz: TimeZone>(now: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let midnight = now.date_naive().and_hms_opt(0, 0, 0)?;
    (0..24 * 60).find_map(|minutes| {
        (midnight + chrono::Duration::minutes(minutes))
            .and_local_timezone(now.timezone())
            .earliest()
    })
}

impl FromStr for WindowMode {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all_time" | "all" => Ok(Self::AllTime),
            "today" => Ok(Self::Today),
            other => Err(TelemetryError::Config(format!(
                "unknown window mode: {other}"
            ))),
        }
    }
}

/// Aggregation engine over an injected store.
///
/// `compute_summary` issues its store reads concurrently and joins them; a
/// failure in any one aborts the whole report, so clients never see a
/// partially populated payload.
#[derive(Clone)]
pub struct ReportEngine {
    store: Arc<dyn TelemetryStore>,
}

impl ReportEngine {
    /// Wraps the given store.
    pub fn new(store: Arc<dyn TelemetryStore>) -> Self {
        Self { store }
    }

    /// Builds the dashboard payload for the window starting at
    /// `window_start` (`None` = all time).
    pub async fn compute_summary(
        &self,
        window_start: Option<DateTime<Utc>>,
    ) -> Result<DashboardReport> {
        let (leaderboard, total_visitors, violations, production, hourly_activity, recent_logs) =
            tokio::try_join!(
                self.store.leaderboard(),
                self.store.count_by_kind(&EventKind::Visitor, window_start),
                self.store.count_by_kind(&EventKind::Violation, window_start),
                self.store
                    .events_by_kind(&EventKind::Production, window_start),
                self.store.activity(
                    &[EventKind::Visitor, EventKind::Production],
                    window_start
                ),
                self.store.recent(RECENT_LOG_LIMIT),
            )?;

        let total_cups = leaderboard.iter().map(|e| e.cups).sum();
        let durations: Vec<u64> = production
            .iter()
            .filter_map(|log| extract_duration_secs(&log.detail))
            .collect();
        let avg_speed = mean_rounded(&durations);

        Ok(DashboardReport {
            kpi: KpiSummary {
                total_cups,
                total_visitors,
                avg_speed,
                violations,
            },
            leaderboard,
            hourly_activity,
            recent_logs,
        })
    }
}
