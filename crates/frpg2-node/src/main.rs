use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use frpg2_node::handler::{NullAuthService, TraceHandler};
use frpg2_node::{GameService, ServerConfig};
use frpg2_protocol::clock::SystemClock;

#[derive(Parser)]
#[command(name = "frpg2-node", about = "FRPG2 game server node")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/server.toml")]
    config: PathBuf,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to register SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        match ServerConfig::load(&cli.config) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load config from {}: {e}", cli.config.display());
                std::process::exit(1);
            }
        }
    } else {
        ServerConfig::default()
    };

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        frpg2_node::logging::init_json(&config.logging.level);
    } else {
        frpg2_node::logging::init(&config.logging.level);
    }

    tracing::info!("FRPG2 game server node");

    let clock = Arc::new(SystemClock::new());
    let mut service = match GameService::bind(
        config.server.bind_addr,
        clock,
        TraceHandler,
        NullAuthService,
    )
    .await
    {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("failed to start game service: {e}");
            std::process::exit(1);
        }
    };

    let tick = Duration::from_millis(config.server.tick_interval_ms);
    tokio::select! {
        _ = service.run(tick) => {}
        _ = shutdown_signal() => {}
    }

    service.shutdown();
}
