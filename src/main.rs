//! Daemon entrypoint: load configuration, initialize the service (rolling
//! back any dangling transaction left by a crash), and serve HTTP until
//! Ctrl-C.

use clap::Parser;
use std::path::PathBuf;
use vikingfs_context::infrastructure::config::ConfigLoader;
use vikingfs_context::infrastructure::logging;
use vikingfs_context::server::{self, ServerOptions};
use vikingfs_context::service::VikingServiceBuilder;

#[derive(Parser, Debug)]
#[command(name = "vikingfs-contextd")]
#[command(about = "VikingFS context database daemon")]
#[command(version)]
struct Cli {
    /// Path to a JSON configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the bind port.
    #[arg(long)]
    port: Option<u16>,

    /// Disable CORS headers.
    #[arg(long)]
    no_cors: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vikingfs_context::server::handlers::observer::mark_start();

    let cli = Cli::parse();
    let config = ConfigLoader::new().load(cli.config.as_deref())?;
    logging::init(&config);

    let host = cli.host.clone().unwrap_or_else(|| config.server.host.clone());
    let port = cli.port.unwrap_or(config.server.port);
    let api_key = config.server.api_key.clone();

    let service = VikingServiceBuilder::new(config).build().await?;
    service.initialize().await?;

    let options = ServerOptions { host, port, api_key, enable_cors: !cli.no_cors };

    tracing::info!(host = %options.host, port = options.port, "starting vikingfs-contextd");
    server::serve(service, options, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    tracing::info!("shutdown signal received");
}
