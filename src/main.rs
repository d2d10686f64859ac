use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rust_segur_sync::config::Config;
use rust_segur_sync::errors::AppError;
use rust_segur_sync::handlers::{self, AppState};
use rust_segur_sync::sync_client::SyncAdapter;

/// Runs the initial sync, then refreshes every `period` when one is set.
///
/// Ticks that land while another refresh is running are skipped.
async fn run_refresh_loop(state: Arc<AppState>, period: Option<Duration>) {
    if let Err(e) = handlers::refresh(&state).await {
        tracing::warn!("Initial sync skipped: {}", e);
    }

    let Some(period) = period else {
        return;
    };

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // First tick completes immediately; the initial sync already covered it.
    interval.tick().await;

    loop {
        interval.tick().await;
        match handlers::refresh(&state).await {
            Ok(report) => tracing::debug!("Automatic refresh {} done", report.sync_id),
            Err(AppError::Conflict(_)) => {
                tracing::debug!("Automatic refresh skipped, sync already running")
            }
            Err(e) => tracing::warn!("Automatic refresh failed: {}", e),
        }
    }
}

/// Main entry point for the application.
///
/// Initializes logging, configuration and the sync adapter, starts the
/// refresh loop and serves the HTTP API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_segur_sync=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let adapter = SyncAdapter::from_config(&config)?;
    tracing::info!("✓ Sync adapter initialized: {}", adapter.endpoint());

    let auto_refresh = (config.auto_refresh_secs > 0)
        .then(|| Duration::from_secs(config.auto_refresh_secs));
    let port = config.port;

    let app_state = Arc::new(AppState::new(config, adapter));

    tokio::spawn(run_refresh_loop(app_state.clone(), auto_refresh));

    // One manual refresh token every 5 seconds per IP, burst of 2
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(5)
            .burst_size(2)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let sync_routes = handlers::sync_routes().layer(GovernorLayer {
        config: governor_conf,
    });

    let app = Router::new()
        .merge(handlers::api_routes())
        .merge(sync_routes)
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                // Request size limit: the API takes no request bodies
                .layer(RequestBodyLimitLayer::new(64 * 1024)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
