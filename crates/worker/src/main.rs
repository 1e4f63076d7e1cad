use std::sync::Arc;

use anyhow::Context;
use quiet_db::store::PgWindowStore;
use quiet_events::{
    DeliveryAdapter, EmailDelivery, LogOnlyDelivery, NotificationSweeper, PgContactResolver,
};
use quiet_worker::config::WorkerConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quiet_worker=debug,quiet_events=debug,quiet_db=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let config = WorkerConfig::from_env().context("Invalid worker configuration")?;

    // --- Database ---
    let pool = quiet_db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;
    quiet_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    quiet_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    // --- Delivery ---
    let delivery: Arc<dyn DeliveryAdapter> = match config.email.clone() {
        Some(email) => {
            tracing::info!(host = %email.smtp_host, port = email.smtp_port, "SMTP delivery enabled");
            Arc::new(EmailDelivery::new(email).context("Failed to build SMTP transport")?)
        }
        None => {
            tracing::warn!("SMTP_HOST not set; reminders will only be logged");
            Arc::new(LogOnlyDelivery)
        }
    };

    let sweeper = NotificationSweeper::new(
        Arc::new(PgWindowStore::new(pool.clone())),
        Arc::new(PgContactResolver::new(pool.clone())),
        delivery,
        config.policy.clone(),
    );

    // The sweep loop runs on this task; the signal future cancels it.
    let cancel = CancellationToken::new();
    tokio::join!(sweeper.run(cancel.clone()), async {
        shutdown_signal().await;
        cancel.cancel();
    });

    pool.close().await;
    tracing::info!("Worker stopped");
    Ok(())
}

/// Wait for SIGINT or (on Unix) SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, finishing current sweep"),
        () = terminate => tracing::info!("Received SIGTERM, finishing current sweep"),
    }
}
