//! Process lifecycle: open the store, sweep, serve, shut down.
//!
//! # Invariants
//! - The startup sweep completes before the listener accepts requests.
//! - The sweeper is cancelled and joined before `serve` returns.

use crate::api;
use crate::config::{ServerConfig, StoreBackend};
use crate::error::ServerError;
use crate::sweeper::ResetSweeper;
use daylist_core::{InMemoryTaskRepository, SqliteTaskRepository, TaskRepository, TaskService};
use log::info;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Opens the configured task store.
///
/// # Errors
/// - `ServerError::Store` when the SQLite database cannot be opened or migrated.
pub fn open_repository(config: &ServerConfig) -> Result<Arc<dyn TaskRepository>, ServerError> {
    let repo: Arc<dyn TaskRepository> = match config.store {
        StoreBackend::Memory => Arc::new(InMemoryTaskRepository::new()),
        StoreBackend::Sqlite => Arc::new(SqliteTaskRepository::open(&config.db_path)?),
    };
    info!(
        "event=store_open module=server status=ok backend={}",
        config.store.as_str()
    );
    Ok(repo)
}

/// Runs the server until Ctrl-C or SIGTERM.
pub async fn run(config: ServerConfig) -> Result<(), ServerError> {
    let service = TaskService::new(open_repository(&config)?);
    let listener = TcpListener::bind(config.bind_addr).await?;
    sweep_and_serve(listener, service, config.sweep_interval(), shutdown_signal()).await
}

/// Runs the startup sweep, then [`serve`]s.
///
/// The listener is bound but no connection is accepted until the sweep has
/// finished.
///
/// # Errors
/// - `ServerError::Store` when the startup sweep fails; nothing is served.
pub async fn sweep_and_serve(
    listener: TcpListener,
    service: TaskService,
    sweep_interval: Duration,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let sweep_service = service.clone();
    let reset = tokio::task::spawn_blocking(move || sweep_service.sweep())
        .await?
        .inspect_err(|err| {
            log::error!("event=startup_sweep module=server status=error error={err}");
        })?;
    info!("event=startup_sweep module=server status=ok reset={reset}");

    serve(listener, service, sweep_interval, shutdown).await
}

/// Serves the API on `listener` with a recurring sweeper until `shutdown`
/// resolves.
pub async fn serve(
    listener: TcpListener,
    service: TaskService,
    sweep_interval: Duration,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    let sweeper = ResetSweeper::new(service.clone(), sweep_interval).spawn();
    let app = api::router(service);

    info!(
        "event=server_listen module=server status=ok addr={}",
        listener.local_addr()?
    );
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    sweeper.shutdown().await;
    info!("event=server_stop module=server status=ok");
    served.map_err(ServerError::Io)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            log::warn!("event=signal_install module=server status=error signal=ctrl_c error={err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                log::warn!(
                    "event=signal_install module=server status=error signal=sigterm error={err}"
                );
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
    info!("event=shutdown_requested module=server status=ok");
}
