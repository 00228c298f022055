mod core;
mod http;
mod source;

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use voicehub_proto::config::Config;
use voicehub_proto::state::{DisplayState, DisplayStore};

use crate::core::{PolicySettings, ScheduleCore};
use crate::source::HttpScheduleSource;

/// Print every published state on its own line.
fn spawn_stdout_surface(mut rx: broadcast::Receiver<DisplayState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(state) => {
                    let now = chrono::Local::now();
                    println!(
                        "{} [{}] {}",
                        now.format("%H:%M:%S"),
                        state.mode_label(),
                        state.text()
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("stdout surface skipped {} updates", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Cancel `token` once `signal` fires. A listener that cannot be installed
/// leaves the token alone so the daemon keeps running.
async fn cancel_on_signal<F>(signal: F, token: CancellationToken)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("Ctrl-C received, shutting down");
            token.cancel();
        }
        Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = voicehub_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("daemon.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,voicehub_daemon=debug")
            }),
        )
        .init();

    info!("Log file: {:?}", log_path);

    let config = Config::load()?;
    info!("Config loaded from: {:?}", Config::config_path());

    let settings = PolicySettings::from_config(&config);
    let source = Arc::new(HttpScheduleSource::new(settings.request_timeout)?);
    let store = Arc::new(DisplayStore::new());
    let (broadcast_tx, broadcast_rx) = broadcast::channel::<DisplayState>(64);
    let (event_tx, event_rx) = mpsc::channel(16);
    let shutdown = CancellationToken::new();

    let _surface_handle = spawn_stdout_surface(broadcast_rx);

    if config.http.enabled {
        let _http_handle = http::start_server(
            config.http.bind_address.clone(),
            config.http.port,
            Arc::clone(&store),
            event_tx.clone(),
        );
    }

    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), shutdown.clone()));

    let core = ScheduleCore::new(settings, source, store, broadcast_tx, shutdown);
    info!("Daemon initialised, running schedule loop");
    core.run(event_rx).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_cancels_token() {
        let token = CancellationToken::new();
        cancel_on_signal(async { Ok(()) }, token.clone()).await;
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_failed_signal_listener_keeps_running() {
        let token = CancellationToken::new();
        let failed = async { Err(std::io::Error::other("no signal driver")) };
        cancel_on_signal(failed, token.clone()).await;
        assert!(!token.is_cancelled());
    }
}
