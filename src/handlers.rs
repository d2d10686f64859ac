use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};

use crate::config::Config;
use crate::dashboard::DashboardStats;
use crate::errors::AppError;
use crate::fallback;
use crate::models::Dataset;
use crate::sync_client::SyncAdapter;
use crate::sync_models::{SyncOutcome, SyncReport};

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the legacy export backend.
    pub adapter: SyncAdapter,
    /// Outcome of the last completed sync. Replaced wholesale on refresh.
    pub current: RwLock<Option<SyncOutcome>>,
    /// Set while a refresh is running. The adapter itself does not
    /// coordinate callers, so overlapping triggers are refused here.
    pub refreshing: AtomicBool,
    /// Signalled whenever a refresh ends, stored or not.
    pub refreshed: Notify,
}

impl AppState {
    pub fn new(config: Config, adapter: SyncAdapter) -> Self {
        Self {
            config,
            adapter,
            current: RwLock::new(None),
            refreshing: AtomicBool::new(false),
            refreshed: Notify::new(),
        }
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }
}

/// Clears the in-flight flag and wakes waiting readers, even if the
/// refresh future is dropped.
struct RefreshGuard<'a>(&'a AppState);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.refreshing.store(false, Ordering::Release);
        self.0.refreshed.notify_waiters();
    }
}

/// Runs one sync cycle and swaps the stored outcome.
///
/// # Returns
///
/// * `Result<SyncReport, AppError>` - The new report, or `Conflict` when
///   another refresh is already running.
pub async fn refresh(state: &AppState) -> Result<SyncReport, AppError> {
    if state
        .refreshing
        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        .is_err()
    {
        return Err(AppError::Conflict("Sync already in progress".to_string()));
    }
    let _guard = RefreshGuard(state);

    let outcome = state.adapter.sync_with_report().await;
    let report = outcome.report.clone();
    *state.current.write().await = Some(outcome);

    Ok(report)
}

/// Returns once a dataset is stored, running the initial sync if needed.
///
/// Readers never see the in-flight guard: when another refresh holds it,
/// they wait for that refresh to end and check again.
pub async fn ensure_synced(state: &AppState) -> Result<(), AppError> {
    loop {
        let refreshed = state.refreshed.notified();
        tokio::pin!(refreshed);
        // Register before checking so a refresh ending in between still wakes us
        refreshed.as_mut().enable();

        if state.current.read().await.is_some() {
            return Ok(());
        }

        match refresh(state).await {
            Ok(_) => return Ok(()),
            Err(AppError::Conflict(_)) => {
                tracing::debug!("Waiting for the running sync");
                refreshed.await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Routes that read or generate data.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/dataset", get(get_dataset))
        .route("/api/v1/sync/status", get(get_sync_status))
        .route("/api/v1/dashboard", get(get_dashboard))
        .route("/api/v1/demo", get(get_demo))
}

/// Routes that trigger a sync against the export backend.
pub fn sync_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/v1/sync", post(trigger_sync))
}

/// Health check endpoint.
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    let last_sync = {
        let current = state.current.read().await;
        current.as_ref().map(|outcome| outcome.report.finished_at)
    };

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-segur-sync",
            "version": env!("CARGO_PKG_VERSION"),
            "syncing": state.is_refreshing(),
            "last_sync": last_sync,
            "auto_refresh_secs": state.config.auto_refresh_secs,
        })),
    )
}

/// GET /api/v1/dataset
///
/// Returns the current dataset, running the first sync if none has completed.
pub async fn get_dataset(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Dataset>, AppError> {
    ensure_synced(&state).await?;

    let current = state.current.read().await;
    current
        .as_ref()
        .map(|outcome| Json(outcome.dataset.clone()))
        .ok_or_else(|| AppError::InternalError("Sync finished without a dataset".to_string()))
}

/// POST /api/v1/sync
///
/// Manual refresh. Always succeeds with a report unless a refresh is
/// already running; fallback data is signalled in the report, not as an error.
pub async fn trigger_sync(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SyncReport>, AppError> {
    tracing::info!("POST /api/v1/sync");
    let report = refresh(&state).await?;
    Ok(Json(report))
}

/// GET /api/v1/sync/status
pub async fn get_sync_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SyncReport>, AppError> {
    let current = state.current.read().await;
    current
        .as_ref()
        .map(|outcome| Json(outcome.report.clone()))
        .ok_or_else(|| AppError::NotFound("No sync has completed yet".to_string()))
}

/// GET /api/v1/dashboard
///
/// Figures for the current dataset, running the first sync if none has completed.
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardStats>, AppError> {
    ensure_synced(&state).await?;

    let current = state.current.read().await;
    current
        .as_ref()
        .map(|outcome| Json(DashboardStats::from_dataset(&outcome.dataset)))
        .ok_or_else(|| AppError::NotFound("No sync has completed yet".to_string()))
}

/// GET /api/v1/demo
///
/// Fresh demo dataset, independent of the stored one.
pub async fn get_demo() -> Json<Dataset> {
    Json(fallback::generate())
}
