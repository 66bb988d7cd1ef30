mod booking;
mod contact;
mod metrics;
mod paystack;
mod ratelimit;
mod server;
mod settings;
mod store;
#[cfg(test)]
mod testutil;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    // Load configuration from environment
    let cfg = settings::Config::from_env();

    // Validate gateway configuration
    if cfg.paystack.secret_key.is_empty() {
        tracing::error!("PAYSTACK_SECRET_KEY not set; exiting");
        return Ok(());
    }
    if cfg.admin_token.is_empty() {
        tracing::warn!("ADMIN_TOKEN not set - internal endpoints will refuse all requests");
    }
    tracing::info!("Starting hotel booking processor");

    let store = store::Store::open(&cfg.database_path)?;
    let provider = paystack::PaystackProvider::new(cfg.paystack.clone())?;
    let gateway: Arc<dyn paystack::PaymentGateway> = Arc::new(provider);
    let limiter = Arc::new(ratelimit::RateLimiter::new(
        cfg.contact_rate_limit,
        cfg.contact_rate_window,
    ));
    let http = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(Duration::from_millis(cfg.paystack.timeout_ms))
        .build()?;

    // Background availability reset; the internal endpoint triggers the same
    // job for platform schedulers.
    let job_store = store.clone();
    let reset_interval = cfg.availability_reset_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(reset_interval);
        loop {
            ticker.tick().await;
            let today = chrono::Utc::now().date_naive();
            match booking::availability::run_reset(&job_store, today) {
                Ok(report) if report.updated_rooms.is_empty() => {}
                Ok(report) => tracing::info!(
                    rooms = ?report.updated_rooms,
                    "scheduled availability reset released rooms"
                ),
                Err(e) => tracing::error!(error = %e, "scheduled availability reset failed"),
            }
        }
    });
    tracing::info!(
        interval = %humantime::format_duration(reset_interval),
        "availability reset job scheduled"
    );

    let state = server::AppState {
        store,
        gateway,
        limiter,
        http,
        cfg: Arc::new(cfg.clone()),
    };
    let app = server::router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", cfg.server_port).parse()?;
    tracing::info!(addr = %addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            return;
        }
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(e) => tracing::error!(error = %e, "failed to install signal handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
