//! Target database configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_data_dir() -> PathBuf {
    PathBuf::from("databases")
}

/// Default foreign-key enforcement on audit sessions.
const fn default_foreign_keys() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Directory holding the auditable database files. Only files inside
    /// this directory can be targeted by name.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Whether audit sessions run with `PRAGMA foreign_keys = ON`, mirroring
    /// how the application itself connects. When off, every declared
    /// constraint is reported as disabled.
    #[serde(default = "default_foreign_keys")]
    pub foreign_keys: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            foreign_keys: default_foreign_keys(),
        }
    }
}
