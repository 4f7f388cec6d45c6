use serde::Serialize;
use tether_audit::Catalog;

use crate::cli::GlobalFlags;
use crate::output::output;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInfo {
    pub id: &'static str,
    pub report_key: &'static str,
    pub description: &'static str,
    pub columns: String,
}

#[must_use]
pub fn describe(catalog: &Catalog) -> Vec<CheckInfo> {
    catalog
        .list_checks()
        .iter()
        .map(|check| CheckInfo {
            id: check.id,
            report_key: check.report_key,
            description: check.description,
            columns: check.columns.join(", "),
        })
        .collect()
}

/// Handle `tether checks`.
pub fn handle(flags: &GlobalFlags) -> anyhow::Result<()> {
    output(&describe(&Catalog::builtin()), flags.format)
}
