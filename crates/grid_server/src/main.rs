use anyhow::Result;
use clap::Parser;
use grid_server::{load_config, logging::setup_logging, signals::shutdown_signal, Args, GridServer};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args).await?;
    setup_logging(&config.logging)?;

    let server = match GridServer::start(config).await {
        Ok(server) => server,
        Err(e) => {
            error!("❌ Grid server failed to start: {}", e);
            return Err(e.into());
        }
    };

    info!("Grid server running, press Ctrl+C to stop");
    shutdown_signal().await?;

    server.shutdown();
    info!("👋 Grid server stopped");
    Ok(())
}
