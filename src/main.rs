use anyhow::Result;
use metricboard::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        service = version::NAME,
        version = version::VERSION,
        expiration_secs = app_config.cache.expiration_secs,
        refresh_interval_secs = app_config.cache.refresh_interval_secs,
        "starting"
    );

    let store = Arc::new(
        sample_repo::SqliteSampleStore::connect(
            &app_config.database.path,
            app_config.database.max_pool_size,
        )
        .await?,
    );
    store.init().await?;

    let cache = Arc::new(cache::QueryCache::new(app_config.cache.expiration()));
    let live = notify::BroadcastSink::new(app_config.publishing.broadcast_capacity);
    let service = Arc::new(service::MetricsService::new(
        store,
        cache,
        Arc::new(live.clone()),
        app_config.cache.max_buckets,
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = refresh_worker::spawn(
        service.clone(),
        refresh_worker::RefreshWorkerConfig {
            refresh_interval_secs: app_config.cache.refresh_interval_secs,
        },
        shutdown_rx,
    );

    let app = routes::app(service, live, app_config.clone());
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            let _ = worker_handle.await;
        }
    }

    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
