//! DirHub agent: keeps an application's projection of one directory
//! subtree converged with the DirHub store.
//!
//! Wires the store, event bus, watcher and controller from configuration
//! and runs until Ctrl+C or SIGTERM.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

use dirhub_controller::{ControllerBuilder, LoggingReconciler};
use dirhub_core::config::{AppConfig, NotifierBackend};
use dirhub_core::error::{AppError, ErrorKind};
use dirhub_database::{DatabasePool, StoreMode};
use dirhub_realtime::{BusWatcher, Watcher, connect_bus};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Agent stopped with an error");
        std::process::exit(1);
    }
}

/// Load configuration for the environment named by `DIRHUB_ENV`.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("DIRHUB_ENV").unwrap_or_else(|_| "development".to_string());
    let config = AppConfig::load(&env)?;
    config.validate()?;
    Ok(config)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting dirhub-agent v{}", env!("CARGO_PKG_VERSION"));

    let mode = StoreMode::from_config(&config.store);
    let db = DatabasePool::connect(&config.database, mode).await?;
    db.migrate().await?;

    let client = Arc::new(db.directory_store());
    let projection = Arc::new(db.projection_store(config.controller.app_name.clone()));

    let mut builder = ControllerBuilder::from_config(&config.controller)?
        .client(client)
        .projection(projection)
        .reconciler(Arc::new(LoggingReconciler::new(
            config.controller.app_name.clone(),
        )));

    match config.notifier.backend {
        _ if !config.controller.watch => {}
        NotifierBackend::Memory => {
            tracing::warn!("The memory bus is process-local; running on sweeps only");
        }
        _ => {
            if let Some(bus) = connect_bus(&config.notifier).await? {
                let watcher: Arc<dyn Watcher> =
                    Arc::new(BusWatcher::new(bus, config.notifier.topic.clone()));
                builder = builder.watcher(watcher);
            }
        }
    }

    let controller = builder.build()?;
    let cancel = CancellationToken::new();

    let signal = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        signal.cancel();
    });

    let result = controller.run(cancel).await;
    db.close().await;

    match result {
        Err(e) if e.is(ErrorKind::Cancelled) => {
            tracing::info!("dirhub-agent shut down gracefully");
            Ok(())
        }
        other => other,
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
