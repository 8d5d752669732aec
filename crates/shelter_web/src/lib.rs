//! Browser-facing dashboard surface.
//!
//! # Responsibility
//! - Serve the dashboard page and a small JSON API over one shared
//!   `Dashboard`.
//! - Run every dashboard call on a blocking worker so store I/O never
//!   stalls the async runtime.
//!
//! # Invariants
//! - Dashboard access is serialized by a single mutex; one event runs to
//!   completion before the next starts.
//! - Handlers never panic; failures become JSON error bodies.
//!
//! ## Routes
//!
//! - `GET /`: dashboard page.
//! - `GET /api/views`: every current derived view.
//! - `POST /api/events`: apply one `DashboardEvent`, return recomputed fragments.
//! - `POST /api/edit`: submit edit-form text for the current edit target.
//! - `GET /health`: `{ "ok": true, "version": ..., "records": ... }`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use log::{error, info};
use serde_json::json;
use shelter_core::{
    core_version, AnimalRepository, Dashboard, DashboardEvent, DashboardViews, DispatchOutcome,
};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::{Arc, Mutex};

const DASHBOARD_HTML: &str = include_str!("../assets/dashboard.html");

/// Dashboard shared by every request handler.
pub type SharedDashboard<R> = Arc<Mutex<Dashboard<R>>>;

/// Failure of the web layer itself; dashboard problems degrade in place.
#[derive(Debug)]
pub enum ApiError {
    /// A previous request panicked while holding the dashboard.
    Poisoned,
    /// The blocking worker could not complete.
    Worker(String),
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Poisoned => write!(f, "dashboard state is unavailable"),
            Self::Worker(message) => write!(f, "dashboard worker failed: {message}"),
        }
    }
}

impl Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("event=api_request module=web status=error error={self}");
        let body = json!({ "ok": false, "error": self.to_string() });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Builds the dashboard router.
pub fn router<R>(dashboard: SharedDashboard<R>) -> Router
where
    R: AnimalRepository + Send + 'static,
{
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/views", get(views_handler))
        .route("/api/events", post(event_handler))
        .route("/api/edit", post(edit_handler))
        .with_state(dashboard)
}

/// Serves the dashboard at `addr` until `shutdown` resolves.
pub async fn serve<R>(
    dashboard: SharedDashboard<R>,
    addr: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error>
where
    R: AnimalRepository + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        "event=http_listen module=web status=ok addr={}",
        listener.local_addr()?
    );
    axum::serve(listener, router(dashboard))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn index_handler() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

/// `GET /health`
async fn health_handler<R>(
    State(dashboard): State<SharedDashboard<R>>,
) -> Result<impl IntoResponse, ApiError>
where
    R: AnimalRepository + Send + 'static,
{
    let records = with_dashboard(dashboard, |dashboard| dashboard.table_len()).await?;
    Ok(Json(json!({
        "ok": true,
        "version": core_version(),
        "records": records,
    })))
}

/// `GET /api/views`
async fn views_handler<R>(
    State(dashboard): State<SharedDashboard<R>>,
) -> Result<Json<DashboardViews>, ApiError>
where
    R: AnimalRepository + Send + 'static,
{
    let views = with_dashboard(dashboard, |dashboard| dashboard.views().clone()).await?;
    Ok(Json(views))
}

/// `POST /api/events`
async fn event_handler<R>(
    State(dashboard): State<SharedDashboard<R>>,
    Json(event): Json<DashboardEvent>,
) -> Result<Json<DispatchOutcome>, ApiError>
where
    R: AnimalRepository + Send + 'static,
{
    let outcome = with_dashboard(dashboard, move |dashboard| dashboard.dispatch(event)).await?;
    Ok(Json(outcome))
}

/// `POST /api/edit`
async fn edit_handler<R>(
    State(dashboard): State<SharedDashboard<R>>,
    Json(values): Json<BTreeMap<String, String>>,
) -> Result<Json<DispatchOutcome>, ApiError>
where
    R: AnimalRepository + Send + 'static,
{
    let outcome =
        with_dashboard(dashboard, move |dashboard| dashboard.submit_edit_form(&values)).await?;
    Ok(Json(outcome))
}

/// Runs `op` under the dashboard lock on a blocking worker thread.
async fn with_dashboard<R, T>(
    dashboard: SharedDashboard<R>,
    op: impl FnOnce(&mut Dashboard<R>) -> T + Send + 'static,
) -> Result<T, ApiError>
where
    R: AnimalRepository + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = dashboard.lock().map_err(|_| ApiError::Poisoned)?;
        Ok(op(&mut guard))
    })
    .await
    .map_err(|err| ApiError::Worker(err.to_string()))?
}
