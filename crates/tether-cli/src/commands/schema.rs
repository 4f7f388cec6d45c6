use tether_audit::AuditSummary;

use crate::cli::GlobalFlags;
use crate::output::output;

/// Handle `tether schema`.
pub fn handle(flags: &GlobalFlags) -> anyhow::Result<()> {
    let schema = schemars::schema_for!(AuditSummary);
    output(&schema, flags.format)
}
