//! Handler for the `findings` command.

use prettytable::{Table, row};
use std::sync::Arc;

use super::Engine;
use crate::error::Result;
use crate::pipeline::findings::FindingsProjector;

/// Handle the `findings` command.
pub fn handle_findings(engine: &Engine, json: bool) -> Result<()> {
    let projector = FindingsProjector::new(Arc::clone(engine.store()));
    let report = projector.list_findings()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("🛡️  Security Findings");
    println!(
        "critical: {}  high: {}  warning: {}  info: {}  |  open: {}  resolved: {}  suppressed: {}",
        report.summary.critical,
        report.summary.high,
        report.summary.warning,
        report.summary.info,
        report.summary.open,
        report.summary.resolved,
        report.summary.suppressed,
    );

    if report.findings.is_empty() {
        println!("\n✅ No security findings");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row!["ID", "SEVERITY", "RESOURCE", "STATUS", "REMEDIATION"]);
    for finding in &report.findings {
        table.add_row(row![
            finding.id,
            finding.severity.to_string().to_uppercase(),
            finding.resource,
            finding.status,
            finding.remediation,
        ]);
    }
    table.printstd();
    Ok(())
}
