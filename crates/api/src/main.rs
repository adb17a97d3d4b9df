//! Smart-City Traffic Pipeline - Main Entry Point

use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.log_level, config.log_format)?;

    info!("=== Smart-City Traffic Pipeline v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Environment: {}, database: {}, model: {}",
        config.app_env,
        config.database_url,
        config.model_path.display()
    );

    run_server(config).await?;

    Ok(())
}
