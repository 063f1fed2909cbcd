//! Handlers for the `alerts` and `alert-status` commands.

use colored::Colorize;
use prettytable::{Table, row};
use std::sync::Arc;

use super::Engine;
use crate::error::Result;
use crate::pipeline::alerts::AlertProjector;
use crate::pipeline::types::{RecoStatus, Severity};

/// Handle the `alerts` command.
pub fn handle_alerts(engine: &Engine, json: bool) -> Result<()> {
    let projector = AlertProjector::new(Arc::clone(engine.store()));
    let alerts = projector.list_alerts()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&alerts)?);
        return Ok(());
    }

    if alerts.is_empty() {
        println!("✅ No active alerts");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row!["ID", "SEVERITY", "SOURCE", "RESOURCE", "SAVING", "MESSAGE"]);
    for alert in &alerts {
        table.add_row(row![
            alert.id,
            colored_severity(alert.severity),
            alert.source,
            alert.affected_resources.join(","),
            alert
                .saving
                .map(|s| format!("${s:.2}"))
                .unwrap_or_else(|| "N/A".into()),
            alert.message,
        ]);
    }
    table.printstd();
    println!("\n{} active alert(s)", alerts.len());
    Ok(())
}

/// Handle the `alert-status` command.
pub fn handle_alert_status(engine: &Engine, alert_id: &str, status: RecoStatus) -> Result<()> {
    let projector = AlertProjector::new(Arc::clone(engine.store()));
    let resource = projector.set_alert_status(alert_id, status)?;
    println!(
        "Alert {} on {}/{} set to {}",
        alert_id.bold(),
        resource.resource_type,
        resource.resource_id,
        status,
    );
    Ok(())
}

fn colored_severity(severity: Severity) -> String {
    let s = severity.to_string().to_uppercase();
    match severity {
        Severity::Critical => s.red().bold().to_string(),
        Severity::High => s.red().to_string(),
        Severity::Warning => s.yellow().to_string(),
        Severity::Info => s.blue().to_string(),
    }
}
