use std::sync::Arc;

use anyhow::Context;
use tether_audit::Auditor;
use tether_config::TetherConfig;
use tether_db::LibsqlProvider;

use crate::cli::GlobalFlags;

/// Load layered configuration and apply command-line overrides.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<TetherConfig> {
    let mut config =
        TetherConfig::load_with_dotenv().context("failed to load tether configuration")?;

    if let Some(data_dir) = &flags.data_dir {
        config.database.data_dir.clone_from(data_dir);
    }
    tracing::debug!(data_dir = %config.database.data_dir.display(), "configuration loaded");
    Ok(config)
}

/// The libSQL provider and an auditor over the built-in catalog.
pub fn auditor(config: &TetherConfig) -> Auditor<LibsqlProvider> {
    let provider = Arc::new(LibsqlProvider::from_config(&config.database));
    Auditor::from_config(provider, &config.audit)
}

/// Resolves when the user interrupts the process.
pub async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler nothing can interrupt us.
        std::future::pending::<()>().await;
    }
}
