//! API server entry point.

use std::sync::Arc;

use accounting::{AccountingService, HttpAccountingClient, InMemoryAccountingService};
use api::config::Config;
use api::{AppState, Store};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, PostgresOrderStore};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn accounting_service(config: &Config) -> Result<Arc<dyn AccountingService>, BoxError> {
    if config.accounting.is_configured() {
        tracing::info!(base_url = %config.accounting.base_url, "using accounting API");
        Ok(Arc::new(HttpAccountingClient::new(&config.accounting)?))
    } else {
        tracing::warn!("accounting credentials missing, using in-memory accounting service");
        Ok(Arc::new(InMemoryAccountingService::new()))
    }
}

async fn serve<S: Store>(
    store: S,
    config: &Config,
    metrics_handle: PrometheusHandle,
) -> Result<(), BoxError> {
    let state = Arc::new(AppState::new(store, accounting_service(config)?, config));
    let app = api::create_app(state, metrics_handle, &config.cors_origins);

    let addr = config.addr();
    tracing::info!(%addr, timezone = %config.timezone, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = Config::from_env()?;

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    // 3. Pick the order store and serve
    match config.database_url {
        Some(ref url) => {
            let pool = PgPoolOptions::new().max_connections(10).connect(url).await?;
            let store = PostgresOrderStore::new(pool);
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL order store");
            serve(store, &config, metrics_handle).await?;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory");
            serve(InMemoryOrderStore::new(), &config, metrics_handle).await?;
        }
    }

    tracing::info!("server shut down gracefully");
    Ok(())
}
