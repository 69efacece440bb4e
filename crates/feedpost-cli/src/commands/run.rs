use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info};

use feedpost_core::{reporter::Reporter, shutdown, storage::Database, AppConfig};

use super::{build_fetch_loop, build_publish_loop, build_reporter, health};

/// Run both loops and the health endpoint until Ctrl+C or SIGTERM
pub async fn run(config: Arc<AppConfig>, db: Database) -> Result<()> {
    let reporter = build_reporter(&config);
    let fetcher = build_fetch_loop(&config, &db, reporter.clone());
    let publisher = build_publish_loop(&config, &db, reporter.clone())?;

    let (shutdown_tx, shutdown) = shutdown::channel();
    tokio::spawn(forward_signals(shutdown_tx));

    let mut tasks = JoinSet::new();

    if config.health.enabled {
        let (listener, _) = health::bind(&config.health.bind_addr).await?;
        let shutdown = shutdown.clone();
        tasks.spawn(async move {
            if let Err(e) = health::serve(listener, shutdown).await {
                error!("Health endpoint failed: {}", e);
            }
        });
    }

    {
        let shutdown = shutdown.clone();
        let reporter = reporter.clone();
        tasks.spawn(async move {
            supervise("Fetcher", fetcher.start(shutdown), &reporter).await;
        });
    }
    {
        let shutdown = shutdown.clone();
        let reporter = reporter.clone();
        tasks.spawn(async move {
            supervise("Notifier", publisher.start(shutdown), &reporter).await;
        });
    }

    println!(
        "feedpost running (fetch every {}s, publish every {}s). Press Ctrl+C to stop.",
        config.sync.fetch_interval_secs, config.sync.publish_interval_secs
    );

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!("Background task panicked: {}", e);
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Wait for a loop to end and report anything other than a clean shutdown
async fn supervise<F>(name: &str, run: F, reporter: &Reporter)
where
    F: Future<Output = feedpost_core::Result<()>>,
{
    match run.await {
        Err(e) if e.is_cancelled() => info!("{} stopped", name),
        Err(e) => {
            error!("{} stopped unexpectedly: {}", name, e);
            reporter.notify(&format!("{} stopped: {}", name, e)).await;
        }
        Ok(()) => info!("{} finished", name),
    }
}

async fn forward_signals(shutdown_tx: watch::Sender<bool>) {
    wait_for_signal().await;
    info!("Received shutdown signal");
    let _ = shutdown_tx.send(true);
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            error!("Cannot listen for SIGTERM: {}", e);
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
