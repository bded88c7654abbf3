use std::path::PathBuf;

use clap::Parser;
use skirmish::prelude::*;

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

/// A tavern, a forest, and whoever shows up to fight in them.
#[derive(Debug, Parser)]
#[command(name = "tavern", version, about)]
struct Args {
    /// TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the config file.
    #[arg(short, long)]
    bind: Option<String>,

    /// Accept WebSocket clients instead of raw TCP.
    #[arg(long)]
    websocket: bool,
}

impl Args {
    fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(bind) = &self.bind {
            config.bind = bind.clone();
        }
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = args.server_config()?;
    skirmish::logging::init(&config.log_filter);

    tracing::info!(bind = %config.bind, websocket = args.websocket, "starting tavern");
    let builder = SkirmishServerBuilder::new().config(config);

    if args.websocket {
        builder.build_websocket().await?.run_until(shutdown_signal()).await?;
    } else {
        builder.build().await?.run_until(shutdown_signal()).await?;
    }
    Ok(())
}
