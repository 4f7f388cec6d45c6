use anyhow::Context;
use tether_config::TetherConfig;
use tether_db::LibsqlProvider;

use crate::cli::GlobalFlags;
use crate::output::output;

/// Handle `tether list`.
pub async fn handle(config: &TetherConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    let provider = LibsqlProvider::from_config(&config.database);
    let names = provider
        .list_databases()
        .await
        .context("failed to list databases")?;
    output(&names, flags.format)
}
