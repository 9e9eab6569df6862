//! PostgreSQL store backed by sqlx.
//!
//! Queries use the runtime API rather than the checked macros, so building
//! the crate never needs a live database. Upserts go through
//! `ON CONFLICT`, which keeps concurrent cup increments atomic on the
//! database side, and every call carries a bounded deadline.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::employee::{EmployeePerformance, STATUS_ACTIVE};
use crate::error::{Result, TelemetryError};
use crate::event::{ActivityPoint, EventKind, EventLog, NewEvent};
use crate::store::{EmployeeStore, EventStore, TelemetryStore};

/// Default per-call deadline; override with [`PgStore::with_timeout`].
const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_CONNECTIONS: u32 = 10;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS event_logs (
    id        UUID PRIMARY KEY,
    timestamp TIMESTAMPTZ NOT NULL,
    event     TEXT NOT NULL,
    detail    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_event_logs_kind_ts ON event_logs (event, timestamp);
CREATE INDEX IF NOT EXISTS idx_event_logs_ts ON event_logs (timestamp DESC);

CREATE TABLE IF NOT EXISTS employee_performance (
    name      TEXT PRIMARY KEY,
    cups      BIGINT NOT NULL DEFAULT 0,
    last_seen TIMESTAMPTZ NOT NULL,
    status    TEXT NOT NULL
);
"#;

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    timestamp: DateTime<Utc>,
    event: String,
    detail: String,
}

impl From<EventRow> for EventLog {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            timestamp: row.timestamp,
            event: EventKind::from(row.event.as_str()),
            detail: row.detail,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ActivityRow {
    timestamp: DateTime<Utc>,
    event: String,
}

impl From<ActivityRow> for ActivityPoint {
    fn from(row: ActivityRow) -> Self {
        Self {
            timestamp: row.timestamp,
            event: EventKind::from(row.event.as_str()),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EmployeeRow {
    name: String,
    cups: i64,
    last_seen: DateTime<Utc>,
    status: String,
}

impl From<EmployeeRow> for EmployeePerformance {
    fn from(row: EmployeeRow) -> Self {
        Self {
            name: row.name,
            cups: row.cups,
            last_seen: row.last_seen,
            status: row.status,
        }
    }
}

/// Store implementation on PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    op_timeout: Duration,
}

impl PgStore {
    /// Connects, bootstraps the schema and returns a ready store.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(DEFAULT_OP_TIMEOUT)
            .connect(database_url)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        info!("postgres store ready");
        Ok(Self {
            pool,
            op_timeout: DEFAULT_OP_TIMEOUT,
        })
    }

    /// Overrides the per-call deadline.
    pub fn with_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Closes the underlying pool; in-flight queries finish first.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(TelemetryError::from),
            Err(_) => {
                warn!(operation = op, "store call exceeded deadline");
                Err(TelemetryError::store(format!("{op} timed out")))
            }
        }
    }
}

#[async_trait]
impl EventStore for PgStore {
    async fn append(&self, event: NewEvent) -> Result<EventLog> {
        let fut = sqlx::query_as::<_, EventRow>(
            r#"
            INSERT INTO event_logs (id, timestamp, event, detail)
            VALUES ($1, COALESCE($2::timestamptz, now()), $3, $4)
            RETURNING id, timestamp, event, detail
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.timestamp)
        .bind(event.event.as_str().to_string())
        .bind(event.detail)
        .fetch_one(&self.pool);

        self.bounded("append", fut).await.map(EventLog::from)
    }

    async fn count_by_kind(&self, kind: &EventKind, since: Option<DateTime<Utc>>) -> Result<u64> {
        let fut = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM event_logs
            WHERE event = $1 AND ($2::timestamptz IS NULL OR timestamp >= $2)
            "#,
        )
        .bind(kind.as_str().to_string())
        .bind(since)
        .fetch_one(&self.pool);

        self.bounded("count_by_kind", fut).await.map(|n| n as u64)
    }

    async fn events_by_kind(
        &self,
        kind: &EventKind,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<EventLog>> {
        let fut = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, timestamp, event, detail FROM event_logs
            WHERE event = $1 AND ($2::timestamptz IS NULL OR timestamp >= $2)
            ORDER BY timestamp ASC
            "#,
        )
        .bind(kind.as_str().to_string())
        .bind(since)
        .fetch_all(&self.pool);

        let rows = self.bounded("events_by_kind", fut).await?;
        Ok(rows.into_iter().map(EventLog::from).collect())
    }

    async fn activity(
        &self,
        kinds: &[EventKind],
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<ActivityPoint>> {
        let tags: Vec<String> = kinds.iter().map(|k| k.as_str().to_string()).collect();
        let fut = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT timestamp, event FROM event_logs
            WHERE event = ANY($1) AND ($2::timestamptz IS NULL OR timestamp >= $2)
            ORDER BY timestamp ASC
            "#,
        )
        .bind(tags)
        .bind(since)
        .fetch_all(&self.pool);

        let rows = self.bounded("activity", fut).await?;
        Ok(rows.into_iter().map(ActivityPoint::from).collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<EventLog>> {
        let fut = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, timestamp, event, detail FROM event_logs
            ORDER BY timestamp DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool);

        let rows = self.bounded("recent", fut).await?;
        Ok(rows.into_iter().map(EventLog::from).collect())
    }

    async fn latest_by_kind(&self, kind: &EventKind) -> Result<Option<EventLog>> {
        let fut = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, timestamp, event, detail FROM event_logs
            WHERE event = $1
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .bind(kind.as_str().to_string())
        .fetch_optional(&self.pool);

        let row = self.bounded("latest_by_kind", fut).await?;
        Ok(row.map(EventLog::from))
    }
}

#[async_trait]
impl EmployeeStore for PgStore {
    async fn upsert_attendance(
        &self,
        name: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<EmployeePerformance> {
        let fut = sqlx::query_as::<_, EmployeeRow>(
            r#"
            INSERT INTO employee_performance (name, cups, last_seen, status)
            VALUES ($1, 0, $2, $3)
            ON CONFLICT (name) DO UPDATE
                SET last_seen = EXCLUDED.last_seen, status = EXCLUDED.status
            RETURNING name, cups, last_seen, status
            "#,
        )
        .bind(name.to_string())
        .bind(seen_at)
        .bind(STATUS_ACTIVE)
        .fetch_one(&self.pool);

        self.bounded("upsert_attendance", fut)
            .await
            .map(EmployeePerformance::from)
    }

    async fn increment_cups(&self, name: &str, by: i64) -> Result<EmployeePerformance> {
        let fut = sqlx::query_as::<_, EmployeeRow>(
            r#"
            INSERT INTO employee_performance (name, cups, last_seen, status)
            VALUES ($1, $2, now(), $3)
            ON CONFLICT (name) DO UPDATE
                SET cups = employee_performance.cups + EXCLUDED.cups
            RETURNING name, cups, last_seen, status
            "#,
        )
        .bind(name.to_string())
        .bind(by)
        .bind(STATUS_ACTIVE)
        .fetch_one(&self.pool);

        self.bounded("increment_cups", fut)
            .await
            .map(EmployeePerformance::from)
    }

    async fn leaderboard(&self) -> Result<Vec<EmployeePerformance>> {
        let fut = sqlx::query_as::<_, EmployeeRow>(
            r#"
            SELECT name, cups, last_seen, status FROM employee_performance
            ORDER BY cups DESC, name ASC
            "#,
        )
        .fetch_all(&self.pool);

        let rows = self.bounded("leaderboard", fut).await?;
        Ok(rows.into_iter().map(EmployeePerformance::from).collect())
    }
}

#[async_trait]
impl TelemetryStore for PgStore {
    async fn ping(&self) -> Result<()> {
        let fut = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool);
        self.bounded("ping", fut).await.map(|_| ())
    }
}
