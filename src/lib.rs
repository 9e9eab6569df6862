//! Operational telemetry backend for smart café deployments.
//!
//! Brewsight ingests discrete operational events (visitor sightings,
//! production completions, procedure violations, staff attendance) plus
//! per-employee cup counters, and serves a dashboard aggregation on top of
//! them: KPIs, a leaderboard, activity points and a recent-event feed.
//!
//! Reads and writes go through an injected [`TelemetryStore`], so the
//! aggregation is deterministic given an explicit window start and runs
//! unchanged against the in-memory store or PostgreSQL.
//!
//! # Example
//!
//! ```
//! use brewsight::{EventKind, Ingestor, MemoryStore, NewEvent, ReportEngine};
//! use std::sync::Arc;
//!
//! # async fn run() -> brewsight::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//!
//! let ingest = Ingestor::new(store.clone());
//! ingest
//!     .append_event(NewEvent::new(
//!         EventKind::Production,
//!         "BUDI selesai kopi (Durasi: 30s)",
//!     ))
//!     .await?;
//!
//! let engine = ReportEngine::new(store);
//! let report = engine.compute_summary(None).await?;
//! assert_eq!(report.kpi.avg_speed, 30);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]

/// Process configuration.
pub mod config;
/// Production-speed parsing.
pub mod duration;
/// Employee performance records.
pub mod employee;
/// Error taxonomy.
pub mod error;
/// Event records and kinds.
pub mod event;
/// Write-side operations.
pub mod ingest;
/// Dashboard aggregation.
pub mod report;
/// HTTP service layer.
pub mod service;
/// Storage backends.
pub mod store;

pub use config::AppConfig;
pub use employee::EmployeePerformance;
pub use error::{Result, TelemetryError};
pub use event::{ActivityPoint, EventKind, EventLog, NewEvent};
pub use ingest::Ingestor;
pub use report::{DashboardReport, KpiSummary, ReportEngine, WindowMode, RECENT_LOG_LIMIT};
pub use service::{DashboardService, HttpServer};
pub use store::{MemoryStore, PgStore, TelemetryStore};

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initializes tracing with an environment-driven filter and JSON output.
///
/// Intended for embedding contexts; the service binary configures its own
/// plain-text subscriber instead.
pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}
