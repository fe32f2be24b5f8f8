//! Vehicle Maintenance Risk Server - Main Entry Point

use api::{init_logging, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_logging(&settings.logging)?;

    info!("=== Vehicle Maintenance Risk v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Model artifact: {}", settings.model.artifact_path);

    run_server(settings).await
}
