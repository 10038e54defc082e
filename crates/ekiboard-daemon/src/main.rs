use std::sync::Arc;

use clap::Parser;
use ekiboard_core::EkiboardConfig;
use ekiboard_fetch::{FetchContext, HttpUpstream};
use ekiboard_scheduler::SchedulerEngine;
use ekiboard_store::SnapshotStore;
use tracing::{info, warn};

/// Keeps the station board's snapshot files current and its renderer running.
#[derive(Debug, Parser)]
#[command(name = "ekiboard", version, about)]
struct Cli {
    /// Config file. Falls back to $EKIBOARD_CONFIG, then ./ekiboard.toml.
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ekiboard=info,ekiboard_scheduler=info,ekiboard_fetch=info,ekiboard_store=info,ekiboard_extract=info"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("EKIBOARD_CONFIG").ok());
    let config = EkiboardConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        EkiboardConfig::default()
    });

    let store = SnapshotStore::new(&config.storage);
    store.ensure_dir()?;
    info!(dir = %store.dir().display(), "snapshot directory ready");

    let upstream = HttpUpstream::new(&config)?;
    let ctx = FetchContext::new(Arc::new(upstream), store, Arc::new(config));
    let engine = SchedulerEngine::new(ctx);

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut scheduler = tokio::spawn(engine.run(shutdown_rx));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
            scheduler.await?;
        }
        finished = &mut scheduler => {
            finished?;
            warn!("scheduler exited on its own");
        }
    }
    Ok(())
}
