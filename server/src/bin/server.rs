//! Ticket gate HTTP server.
//!
//! Authorizes ticket holders to watch the configured live stream.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use ticket_gate_auth::{
    AuthorizationBridge, CredentialCodec, HttpStreamSessionProvider, HttpTicketingProvider,
};
use ticket_gate_core::SystemClock;
use ticket_gate_runtime::metrics::{MetricsServer, register_metrics};
use ticket_gate_server::{AppState, Config, build_router, cors_layer};
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is normal in production
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ticket_gate=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ticket gate");

    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration, refusing to start");
            return Err(e.into());
        }
    };
    info!(
        stream_id = %config.binding.stream_id,
        ticketing = %config.ticketing.base_url,
        stream_platform = %config.stream_platform.api_base_url,
        frontend = %config.frontend.url,
        "Configuration loaded"
    );

    // Metrics
    if config.server.metrics_enabled {
        let metrics_addr: SocketAddr =
            format!("{}:{}", config.server.metrics_host, config.server.metrics_port).parse()?;
        let mut metrics_server = MetricsServer::new(metrics_addr);
        metrics_server.start()?;
        register_metrics();
        info!(address = %metrics_addr, "Metrics endpoint started");
    }

    // Upstream providers
    let timeout = config.upstream.timeout;
    let ticketing = HttpTicketingProvider::new(config.ticketing.clone(), timeout)?;
    let streams = HttpStreamSessionProvider::new(config.stream_platform.clone(), timeout)?;
    let codec = CredentialCodec::new(config.credential.clone(), Arc::new(SystemClock))?;

    let bridge = AuthorizationBridge::new(
        ticketing,
        streams,
        codec,
        config.eligibility.clone(),
        config.binding.clone(),
        config.redirect_uri.clone(),
    )
    .with_retry_policy(config.upstream.retry_policy());

    let state = AppState::new(bridge, config.frontend.clone());
    let app = build_router(state, cors_layer(&config.server.cors_allowed_origins));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    // Run server with graceful shutdown, bounded by SHUTDOWN_TIMEOUT
    let shutdown = Arc::new(Notify::new());
    let trigger = Arc::clone(&shutdown);
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        trigger.notify_one();
    });

    let grace = Duration::from_secs(config.server.shutdown_timeout);
    let deadline = async move {
        shutdown.notified().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server.into_future() => result?,
        () = deadline => warn!(timeout_secs = grace.as_secs(), "Shutdown timed out, dropping open connections"),
    }

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Waits for:
/// - Ctrl+C (SIGINT)
/// - SIGTERM (in production environments)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
