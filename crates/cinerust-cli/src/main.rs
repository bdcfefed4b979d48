use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use cinerust_application::{build_clients, AppState, DownloadMonitor, FailedDownloadHandler};
use cinerust_config::load as load_config;
use cinerust_infrastructure::repositories::HistoryRepository;
use cinerust_infrastructure::sqlite_adapters::SqliteHistoryRepository;
use cinerust_infrastructure::{http_client, init_database};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = load_config(None)?;
    let state = AppState::new(config.clone());
    state.on_start();

    let pool = init_database(&config).await?;
    let history: Arc<dyn HistoryRepository> = Arc::new(SqliteHistoryRepository::new(pool));
    let failed_downloads = FailedDownloadHandler::new(history);

    let http = http_client();
    let clients = build_clients(&config.download.clients, &http);
    info!(
        target: "cli",
        clients = clients.len(),
        "download clients configured"
    );

    let poll_timeout = Duration::from_secs(config.download.poll_timeout_secs);
    let mut monitor = DownloadMonitor::new(clients, poll_timeout);

    let refresh_interval = Duration::from_secs(config.sync.queue_refresh_secs);
    let mut ticker = tokio::time::interval(refresh_interval);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                monitor.refresh().await;
                let items = monitor.items();
                debug!(target: "cli", items = items.len(), "queue refreshed");

                if let Err(err) = failed_downloads.handle(&items).await {
                    warn!(target: "cli", error = %err, "failed-download handling errored");
                }
            }
            _ = &mut shutdown => {
                break;
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let fmt_layer = fmt::layer().with_target(true).with_thread_names(true).with_level(true);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let mut interrupt = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .expect("install SIGINT handler");

    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("install SIGTERM handler");

    #[cfg(not(unix))]
    let interrupt = tokio::signal::ctrl_c();

    #[cfg(unix)]
    tokio::select! {
        _ = interrupt.recv() => {},
        _ = terminate.recv() => {},
    }

    #[cfg(not(unix))]
    {
        interrupt.await.expect("ctrl_c handler");
    }

    info!(target: "cli", "shutdown signal received");
}

#[cfg(test)]
mod tests {
    #[cfg(unix)]
    #[test]
    fn test_unix_signal_kinds_available() {
        use tokio::signal::unix::SignalKind;
        let _ = SignalKind::interrupt();
        let _ = SignalKind::terminate();
    }

    #[cfg(not(unix))]
    #[test]
    fn test_windows_signals_available() {
        let _ = tokio::signal::ctrl_c();
    }
}
