use clap::{Args, Subcommand};

/// Top-level commands of the `tether` binary.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Audit one database and print the report
    Run(RunArgs),

    /// List the databases available for auditing
    List,

    /// List the checks every audit runs
    Checks,

    /// Serve the audit endpoint over HTTP
    Serve(ServeArgs),

    /// Print the JSON schema of the audit summary
    Schema,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Database name (file stem inside the data directory)
    pub database: String,

    /// Print only the derived summary
    #[arg(long)]
    pub summary_only: bool,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.bind)
    #[arg(long)]
    pub bind: Option<String>,

    /// Request-handling threads (overrides server.workers)
    #[arg(long)]
    pub workers: Option<usize>,
}
