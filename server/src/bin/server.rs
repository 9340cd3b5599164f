//! Headless server binary.

use tracing_subscriber::EnvFilter;

use pyroprint_lib::app::SharedState;
use pyroprint_lib::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting PyroPrint");

    let (db, config, dir) = pyroprint_lib::init_foundation()?;
    let state = SharedState::new(db, config, dir);

    let server_state = state.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::start_server(server_state).await {
            tracing::error!("Server failed: {e}");
        }
    });

    tracing::info!(
        port = state.server_port(),
        data_dir = %state.data_dir().display(),
        "Server running. Press Ctrl+C to stop."
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down...");

    server_handle.abort();
    Ok(())
}
