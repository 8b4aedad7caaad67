//! Daemon binary for the Ticksight telemetry collector.
//!
//! Wires together the tick-loop host, the sliding-window sampler, the
//! metric history store, the credential store and the WebSocket
//! gateway, then runs the tick loop until a shutdown is requested over
//! the gateway (or the process is terminated).
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `ticksight.yaml`
//! 3. Load or generate the shared secret
//! 4. Open the metric history store
//! 5. Create the tick sampler and the loop host
//! 6. Assemble the dispatcher and session registry
//! 7. Install the log relay on the host
//! 8. Start the gateway server
//! 9. Start the periodic metric collection task
//! 10. Run the tick loop until shutdown

mod error;
mod host;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use ticksight_auth::CredentialStore;
use ticksight_core::{CollectorConfig, HostMetricsAdapter, HostRuntime, TickSampler, TickStatsHandle};
use ticksight_db::{MetricSample, MetricStore};
use ticksight_gateway::{
    spawn_gateway, Dispatcher, DispatcherConfig, LogRelay, ServerConfig, SessionRegistry,
};

use crate::error::DaemonError;
use crate::host::LoopHost;

/// Application entry point for the daemon.
///
/// # Errors
///
/// Returns an error if any startup step fails; the tick loop itself
/// only ends on a requested shutdown.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("ticksight-daemon starting");

    run().await?;

    info!("ticksight-daemon shutdown complete");
    Ok(())
}

async fn run() -> Result<(), DaemonError> {
    // 2. Load configuration.
    let config = CollectorConfig::load_or_default(Path::new("ticksight.yaml"))?;
    info!(
        port = config.api.port,
        target_tick_rate = config.sampling.target_tick_rate,
        collection_interval_secs = config.sampling.collection_interval_secs,
        "configuration loaded"
    );

    // 3. Load or generate the shared secret.
    let credentials = Arc::new(CredentialStore::load_or_generate(
        &config.storage.token_file(),
    ));

    // 4. Open the metric history store.
    let store = MetricStore::open(&config.storage.database_file()).await?;

    // 5. Create the tick sampler and the loop host.
    let mut sampler = TickSampler::new(config.sampling.target_tick_rate);
    let stats = sampler.handle();
    let host = Arc::new(LoopHost::new(config.sampling.target_tick_rate));

    // 6. Assemble the dispatcher and session registry.
    let host_metrics = Arc::new(HostMetricsAdapter::new());
    let sessions = Arc::new(SessionRegistry::new());
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&host) as Arc<dyn HostRuntime>,
        stats.clone(),
        Arc::clone(&host_metrics),
        credentials,
        store.clone(),
        Arc::clone(&sessions),
        DispatcherConfig::from_collector(&config),
    ));

    // 7. Install the log relay on the host.
    host.set_log_sink(Arc::new(LogRelay::new(sessions)));

    // 8. Start the gateway server.
    let server_config = ServerConfig {
        host: config.api.host.clone(),
        port: config.api.port,
    };
    let gateway = spawn_gateway(server_config, Arc::clone(&dispatcher)).await?;

    // 9. Start the periodic metric collection task.
    let collector = spawn_collection(
        store,
        stats,
        host_metrics,
        config.sampling.collection_interval_secs,
    );

    // 10. Run the tick loop until shutdown.
    info!("entering tick loop");
    host.run(&mut sampler).await;

    collector.abort();
    gateway.abort();
    Ok(())
}

/// Spawn the task that persists one metric sample per collection
/// interval. Store failures are logged and the cadence continues.
fn spawn_collection(
    store: MetricStore,
    stats: TickStatsHandle,
    host_metrics: Arc<HostMetricsAdapter>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        // The first tick fires immediately; skip it so the first
        // sample covers a full interval.
        interval.tick().await;
        loop {
            interval.tick().await;
            let snapshot = host_metrics.sample();
            let sample = MetricSample {
                tps: stats.tps_5s(),
                mspt: stats.mspt(),
                cpu_process: snapshot.cpu_process,
                cpu_system: snapshot.cpu_system,
                memory_used: snapshot.mem_used,
                memory_max: snapshot.mem_max,
            };
            if let Err(error) = store.append(&sample).await {
                tracing::warn!(%error, "failed to persist metric sample");
            } else {
                tracing::debug!(tps = sample.tps, mspt = sample.mspt, "metric sample persisted");
            }
        }
    })
}
