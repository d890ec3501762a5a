use super::HandlerContext;
use crate::ai;
use crate::api::{self, AppState};
use crate::cli::OutputFormatter;
use crate::config::Config;
use crate::error::Result;
use crate::events::ChannelBus;
use crate::triage::{Sweeper, Triage, TriageWorker};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run the API, the triage worker and the periodic sweep until ctrl-c
pub async fn handle_serve(
    config: Config,
    host: Option<String>,
    port: Option<u16>,
    formatter: &OutputFormatter,
) -> Result<()> {
    let ctx = HandlerContext::new(config).await?;
    let config = &ctx.config;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    let analyzer = ai::from_config(&config.ai)?;
    let (bus, events) = ChannelBus::new(config.triage.queue_capacity);
    let bus = Arc::new(bus);

    let triage = Triage::new(
        ctx.storage.clone(),
        ctx.storage.clone(),
        analyzer,
        ctx.storage.clone(),
    )
    .configure(&config.triage, &config.ai);
    let worker = TriageWorker::new(triage, config.triage.workers);
    let sweeper = Sweeper::new(
        ctx.storage.clone(),
        ctx.storage.clone(),
        bus.clone(),
        Duration::from_secs(config.sweep.stale_after_secs),
    );
    let state = Arc::new(AppState::new(
        ctx.storage.clone(),
        ctx.storage.clone(),
        bus,
        ctx.tokens(),
    ));

    let shutdown = CancellationToken::new();
    let on_signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        on_signal.cancel();
    });

    let worker_task = tokio::spawn(worker.run(events, shutdown.clone()));
    let sweep_task = tokio::spawn(
        sweeper.run(Duration::from_secs(config.sweep.interval_secs), shutdown.clone()),
    );

    formatter.success(&format!("Serving on http://{host}:{port} (ctrl-c to stop)"));
    let served = api::serve(&host, port, state, shutdown.clone()).await;
    shutdown.cancel();

    for (name, task) in [("triage worker", worker_task), ("sweeper", sweep_task)] {
        if let Err(e) = task.await {
            warn!(task = name, error = %e, "Background task ended abnormally");
        }
    }

    served?;
    formatter.success("Stopped");
    Ok(())
}
