//! Turnstile booking server.
//!
//! Deployable binary for the reconciliation core:
//! - loads configuration from the environment
//! - connects the `PostgreSQL` pool and runs migrations
//! - wires the provider gateway and the notifier
//! - serves the booking router until Ctrl+C
//!
//! # Usage
//!
//! ```bash
//! # Start infrastructure
//! docker compose up -d
//!
//! # Run server
//! cargo run --bin server
//! ```

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use turnstile_booking::config::EngineSettings;
use turnstile_booking::gateway::RestPaymentGateway;
use turnstile_booking::notifier::{AnyNotifier, ConsoleNotifier, SmtpNotifier};
use turnstile_booking::stores::postgres::{
    self, PostgresInventoryStore, PostgresPaymentStore, PostgresRegistrationStore,
};
use turnstile_booking::{BookingConfig, BookingEnvironment, booking_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,turnstile_booking=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Turnstile booking server...");

    // Load configuration
    let config = BookingConfig::from_env();
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        gateway = %config.gateway.base_url,
        "Configuration loaded"
    );

    // Connect PostgreSQL and migrate
    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .acquire_timeout(Duration::from_secs(config.postgres.connect_timeout))
        .connect(&config.postgres.url)
        .await?;
    postgres::migrate(&pool).await?;
    tracing::info!("Database connected, migrations applied");

    // Wire collaborators
    let gateway = RestPaymentGateway::new(&config.gateway)?;
    let notifier = config.smtp.as_ref().map_or_else(
        || {
            tracing::warn!("SMTP not configured, using console notifier");
            AnyNotifier::Console(ConsoleNotifier::new())
        },
        |smtp| AnyNotifier::Smtp(SmtpNotifier::new(smtp)),
    );

    let environment = Arc::new(BookingEnvironment::new(
        PostgresInventoryStore::new(pool.clone()),
        PostgresRegistrationStore::new(pool.clone()),
        PostgresPaymentStore::new(pool),
        gateway,
        notifier,
        EngineSettings::from(&config.gateway),
    ));

    let app = booking_router(environment).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Turnstile booking server is running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
