// ledsrv: serves LED state to clients over named pipes
//
// Configuration comes from the environment only (see config.rs), e.g.
//   LEDSRV_FIFO=/run/ledsrv LEDSRV_VIEW=log RUST_LOG=debug ledsrv
use anyhow::{Context, Result};
use ledsrv_daemon::{create_view, signal, Server, ServerConfig};
use tracing::info;

fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "ledsrv={level},ledsrv_daemon={level},ledsrv_transport={level},ledsrv_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let config = ServerConfig::from_env().context("Invalid configuration")?;
    init_logging(&config.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), pid = std::process::id(), "ledsrv starting");
    info!(
        control = ?config.control_path,
        inbound = %config.paths.inbound,
        outbound = %config.paths.outbound,
        policy = ?config.client_failure,
        view = ?config.view,
        "Configuration"
    );

    signal::install(&config.control_path).context("Failed to install signal handlers")?;

    let view = create_view(config.view);
    let mut server = Server::bind(config, view).context("Failed to start server")?;
    server.run().context("Server terminated")?;

    info!("Shutdown complete");
    Ok(())
}
