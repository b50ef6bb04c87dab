//! StudyHall API Server
//!
//! The main API server for StudyHall, providing payment initiation,
//! gateway webhook ingestion, and usage quota endpoints.

use std::net::SocketAddr;

use axum::http::{header, Method};
use studyhall_billing::{PaystackClient, PaystackConfig, QuotaLedger};
use studyhall_shared::{create_pool, run_migrations};
use time::OffsetDateTime;
use tokio::time::{interval, Duration};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use studyhall_api::{routes::create_router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,studyhall_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Starting StudyHall API Server v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    tracing::info!("Connecting to database...");
    let pool = create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database connection established");

    // Run migrations
    tracing::info!("Running database migrations...");
    run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Gateway client; the callback URL falls back to the public URL of
    // this deployment when not set explicitly
    let mut gateway_config = PaystackConfig::from_env()?;
    if std::env::var("PAYMENT_CALLBACK_URL").is_err() {
        gateway_config.callback_url = format!("{}/payment/verify", config.public_url);
    }
    let paystack = PaystackClient::new(gateway_config)?;

    // Create application state
    let state = AppState::new(pool.clone(), config.clone(), paystack);

    // Start background monthly usage reset task
    let quota_for_reset = state.quota.clone();
    tokio::spawn(async move {
        monthly_reset_task(quota_for_reset).await;
    });
    tracing::info!("Monthly usage reset task started");

    // Build CORS layer - restrict to allowed origins only
    // Default to localhost for development; production should set ALLOWED_ORIGINS
    let allowed_origins: Vec<axum::http::HeaderValue> = std::env::var("ALLOWED_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string())
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    tracing::info!(
        allowed_origins = ?allowed_origins,
        "CORS configured with {} allowed origins",
        allowed_origins.len()
    );

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true);

    // Build the router
    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Parse bind address
    let addr: SocketAddr = config.bind_address.parse()?;
    tracing::info!("Starting server on {}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Background task that zeroes free-tier usage counters when the
/// calendar month rolls over. Checks hourly; premium accounts are
/// untouched by the reset.
async fn monthly_reset_task(quota: QuotaLedger) {
    let mut interval = interval(Duration::from_secs(3600));
    let mut current_month = OffsetDateTime::now_utc().month();

    loop {
        interval.tick().await;

        let month = OffsetDateTime::now_utc().month();
        if month == current_month {
            continue;
        }

        match quota.reset_usage().await {
            Ok(count) => {
                tracing::info!(profiles = count, "Monthly usage reset complete");
                current_month = month;
            }
            Err(e) => {
                // Leave current_month unchanged so the next tick retries
                tracing::error!(error = ?e, "Monthly usage reset failed");
            }
        }
    }
}
