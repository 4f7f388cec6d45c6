use tether_config::TetherConfig;

use crate::cli::ServeArgs;
use crate::server;

/// Handle `tether serve`.
pub async fn handle(args: &ServeArgs, config: &TetherConfig) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(bind) = &args.bind {
        config.server.bind.clone_from(bind);
    }
    if let Some(workers) = args.workers {
        anyhow::ensure!(workers > 0, "--workers must be greater than zero");
        config.server.workers = workers;
    }
    server::serve(&config).await
}
