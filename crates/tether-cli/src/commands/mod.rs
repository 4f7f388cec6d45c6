use tether_config::TetherConfig;

use crate::cli::{Commands, GlobalFlags};

pub mod checks;
pub mod list;
pub mod run;
pub mod schema;
pub mod serve;

/// Route a parsed command to its handler.
pub async fn dispatch(
    command: Commands,
    config: &TetherConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => run::handle(&args, config, flags).await,
        Commands::List => list::handle(config, flags).await,
        Commands::Serve(args) => serve::handle(&args, config).await,
        Commands::Checks => checks::handle(flags),
        Commands::Schema => schema::handle(flags),
    }
}
