//! HTTP service exposing ingestion and the dashboard aggregation.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::employee::canonical_name;
use crate::error::{Result, TelemetryError};
use crate::event::{EventKind, EventLog, NewEvent};
use crate::ingest::Ingestor;
use crate::report::{DashboardReport, ReportEngine, WindowMode, RECENT_LOG_LIMIT};
use crate::store::{EventStore, TelemetryStore};

/// Largest accepted request body; attendance photos come through here.
const MAX_REQUEST_SIZE: usize = 5 * 1024 * 1024;

/// Per-request deadline.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Cap on concurrent in-flight requests.
const MAX_CONCURRENT_REQUESTS: usize = 512;

impl IntoResponse for TelemetryError {
    fn into_response(self) -> Response {
        let status = match &self {
            TelemetryError::Validation(_) => StatusCode::BAD_REQUEST,
            TelemetryError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Body of `POST /api/event`.
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    /// Kind tag, e.g. `PRODUCTION`.
    pub event: EventKind,
    /// Free-text description.
    pub detail: String,
    /// Explicit event time; defaults to "now".
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// On a `PRODUCTION` event, the employee credited with the cup.
    #[serde(default)]
    pub employee: Option<String>,
}

/// Body of a successful attendance registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// Human-readable confirmation.
    pub message: String,
    /// Stored photo filename; its stem is the canonical employee name.
    pub filename: String,
}

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `"healthy"` while the store answers pings.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since the service started.
    pub uptime_seconds: u64,
}

/// Shared state behind the router.
#[derive(Clone)]
pub struct DashboardService {
    engine: ReportEngine,
    ingest: Ingestor,
    store: Arc<dyn TelemetryStore>,
    photo_dir: PathBuf,
    window: WindowMode,
    started_at: Instant,
}

impl DashboardService {
    /// Builds the service around a store and the runtime configuration.
    pub fn new(store: Arc<dyn TelemetryStore>, config: &AppConfig) -> Self {
        Self {
            engine: ReportEngine::new(Arc::clone(&store)),
            ingest: Ingestor::new(Arc::clone(&store)),
            store,
            photo_dir: config.photo_dir.clone(),
            window: config.window,
            started_at: Instant::now(),
        }
    }

    /// Builds the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(Self::health_handler))
            .route("/api/event", post(Self::append_event_handler))
            .route(
                "/api/attendance/register",
                post(Self::register_attendance_handler),
            )
            .route("/api/dashboard/summary", get(Self::dashboard_summary_handler))
            .route("/api/visitor/latest", get(Self::latest_visitor_handler))
            .route("/api/logs/recent", get(Self::recent_logs_handler))
            .layer(DefaultBodyLimit::max(MAX_REQUEST_SIZE))
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.clone())
    }

    #[tracing::instrument(name = "GET /health", skip(service))]
    async fn health_handler(State(service): State<DashboardService>) -> Response {
        match service.store.ping().await {
            Ok(()) => Json(HealthResponse {
                status: "healthy".to_string(),
                version: crate::VERSION.to_string(),
                uptime_seconds: service.started_at.elapsed().as_secs(),
            })
            .into_response(),
            Err(err) => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "error": err.to_string() })),
            )
                .into_response(),
        }
    }

    #[tracing::instrument(name = "POST /api/event", skip(service, payload))]
    async fn append_event_handler(
        State(service): State<DashboardService>,
        payload: std::result::Result<Json<EventRequest>, JsonRejection>,
    ) -> Result<(StatusCode, Json<EventLog>)> {
        let Json(request) = payload.map_err(|err| TelemetryError::validation(err.body_text()))?;

        // Resolve the cup credit up front: a bad employee name must reject
        // the request before the event is appended.
        let credit = match (&request.event, request.employee.as_deref()) {
            (EventKind::Production, Some(raw)) => {
                let employee = canonical_name(raw);
                if employee.is_empty() {
                    return Err(TelemetryError::validation("employee name must not be empty"));
                }
                Some(employee)
            }
            _ => None,
        };

        let new_event = NewEvent {
            event: request.event,
            detail: request.detail,
            timestamp: request.timestamp,
        };
        let stored = service.ingest.append_event(new_event).await?;

        if let Some(employee) = credit {
            service.ingest.increment_cups(&employee, 1).await?;
        }

        Ok((StatusCode::CREATED, Json(stored)))
    }

    #[tracing::instrument(name = "POST /api/attendance/register", skip_all)]
    async fn register_attendance_handler(
        State(service): State<DashboardService>,
        mut multipart: Multipart,
    ) -> Result<Json<RegisterResponse>> {
        let mut name: Option<String> = None;
        let mut photo: Option<(String, Bytes)> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| TelemetryError::validation(format!("invalid multipart payload: {err}")))?
        {
            let field_name = field.name().unwrap_or_default().to_string();
            match field_name.as_str() {
                "name" => {
                    let value = field.text().await.map_err(|err| {
                        TelemetryError::validation(format!("unreadable name field: {err}"))
                    })?;
                    name = Some(value);
                }
                "photo" => {
                    let original = field.file_name().unwrap_or("photo.jpg").to_string();
                    let data = field.bytes().await.map_err(|err| {
                        TelemetryError::validation(format!("unreadable photo field: {err}"))
                    })?;
                    photo = Some((original, data));
                }
                _ => {}
            }
        }

        let name = name.ok_or_else(|| TelemetryError::validation("missing field: name"))?;
        let (original, data) =
            photo.ok_or_else(|| TelemetryError::validation("missing field: photo"))?;
        if data.is_empty() {
            return Err(TelemetryError::validation("photo must not be empty"));
        }

        let canonical = canonical_name(&name);
        if canonical.is_empty() {
            return Err(TelemetryError::validation("employee name must not be empty"));
        }
        if !filename_safe(&canonical) {
            return Err(TelemetryError::validation(
                "employee name may only contain letters, digits, spaces, '-' and '_'",
            ));
        }

        // The face watcher keys on the filename stem, so the stem must be
        // exactly the canonical name.
        let filename = photo_filename(&canonical, &original);
        tokio::fs::create_dir_all(&service.photo_dir).await?;
        tokio::fs::write(service.photo_dir.join(&filename), &data).await?;

        let now = Utc::now();
        service
            .ingest
            .upsert_employee_attendance(&canonical, now)
            .await?;
        service
            .ingest
            .append_event(
                NewEvent::new(
                    EventKind::Attendance,
                    format!("{canonical} registered for attendance"),
                )
                .at(now),
            )
            .await?;

        info!(employee = %canonical, file = %filename, "attendance registered");
        Ok(Json(RegisterResponse {
            message: format!("{canonical} registered"),
            filename,
        }))
    }

    #[tracing::instrument(name = "GET /api/dashboard/summary", skip(service))]
    async fn dashboard_summary_handler(
        State(service): State<DashboardService>,
    ) -> Result<Json<DashboardReport>> {
        let window_start = service.window.window_start(Local::now());
        let report = service.engine.compute_summary(window_start).await?;
        Ok(Json(report))
    }

    #[tracing::instrument(name = "GET /api/visitor/latest", skip(service))]
    async fn latest_visitor_handler(
        State(service): State<DashboardService>,
    ) -> Result<Json<serde_json::Value>> {
        let latest = service.store.latest_by_kind(&EventKind::Visitor).await?;
        match latest {
            Some(log) => {
                let value = serde_json::to_value(&log)
                    .map_err(|err| TelemetryError::Internal(err.to_string()))?;
                Ok(Json(value))
            }
            None => Ok(Json(json!({}))),
        }
    }

    #[tracing::instrument(name = "GET /api/logs/recent", skip(service))]
    async fn recent_logs_handler(
        State(service): State<DashboardService>,
    ) -> Result<Json<Vec<EventLog>>> {
        let logs = service.store.recent(RECENT_LOG_LIMIT).await?;
        Ok(Json(logs))
    }
}

fn filename_safe(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_'))
}

fn photo_filename(canonical: &str, original: &str) -> String {
    let ext = original
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| "jpg".to_string());
    format!("{canonical}.{ext}")
}

/// HTTP front for the service.
pub struct HttpServer {
    service: DashboardService,
    addr: SocketAddr,
}

impl HttpServer {
    /// Creates a server that binds `addr` once [`run`](Self::run) is
    /// called.
    pub fn new(service: DashboardService, addr: SocketAddr) -> Self {
        Self { service, addr }
    }

    /// Binds and serves until the surrounding task is cancelled.
    pub async fn run(self) -> Result<()> {
        let router = self.service.router();
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "telemetry service listening");
        axum::serve(listener, router).await?;
        Ok(())
    }
}
