//! Handlers for the `resources` and `show` commands.

use colored::Colorize;
use prettytable::{Table, row};

use super::Engine;
use crate::error::Result;
use crate::pipeline::types::{Resource, ResourceBatch, ResourceKind, ResourceStatus};

/// Handle the `resources` command.
pub async fn handle_resources(
    engine: &Engine,
    kind: Option<ResourceKind>,
    json: bool,
) -> Result<()> {
    let kinds: Vec<ResourceKind> = match kind {
        Some(k) => vec![k],
        None => ResourceKind::ALL.to_vec(),
    };

    let mut batches: Vec<(ResourceKind, ResourceBatch)> = Vec::new();
    for kind in kinds {
        let batch = engine.list_resources(kind).await?;
        batches.push((kind, batch));
    }

    if json {
        let value = serde_json::json!(
            batches
                .iter()
                .map(|(kind, batch)| serde_json::json!({"kind": kind, "batch": batch}))
                .collect::<Vec<_>>()
        );
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row![
        "RESOURCE", "KIND", "STATUS", "UTIL %", "COST/MO", "RECOMMENDATIONS"
    ]);

    let mut running = 0;
    let mut idle = 0;
    for (_, batch) in &batches {
        running += batch.running;
        idle += batch.idle;
        for resource in &batch.resources {
            table.add_row(row![
                resource.resource_id,
                resource.resource_type,
                colored_status(resource),
                format!("{:.0}", resource.utilization),
                format!("${:.2}", resource.monthly_cost),
                summarize_recommendations(resource),
            ]);
        }
    }
    table.printstd();
    println!(
        "\n{} running, {} idle across {} kind(s)",
        running,
        idle,
        batches.len()
    );
    Ok(())
}

/// Handle the `show` command.
pub fn handle_show(engine: &Engine, resource_id: &str, kind: ResourceKind, json: bool) -> Result<()> {
    let resource = engine.get_resource(resource_id, kind)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&resource)?);
        return Ok(());
    }

    println!(
        "{} ({}, {}) - {} - ${:.2}/mo at {:.0}% utilization",
        resource.resource_id.bold(),
        resource.resource_type,
        resource.region,
        colored_status(&resource),
        resource.monthly_cost,
        resource.utilization,
    );
    if resource.recommendations.is_empty() {
        println!("  no recommendations");
    }
    for reco in &resource.recommendations {
        println!(
            "  [{}] {} ({}, {}) - saving {}",
            reco.status,
            reco.title.bold(),
            reco.reco_type,
            reco.severity,
            reco.saving_display(),
        );
        for step in &reco.solution_steps {
            println!("      {}. {}", step.order, step.human_command);
        }
    }
    Ok(())
}

fn colored_status(resource: &Resource) -> String {
    let s = resource.status.to_string();
    match resource.status {
        ResourceStatus::Running => s.green().to_string(),
        ResourceStatus::Optimized => s.cyan().to_string(),
        ResourceStatus::Idle | ResourceStatus::Stopped => s.yellow().to_string(),
        ResourceStatus::Unknown => s.dimmed().to_string(),
    }
}

fn summarize_recommendations(resource: &Resource) -> String {
    if resource.recommendations.is_empty() {
        return "-".into();
    }
    resource
        .recommendations
        .iter()
        .map(|r| format!("{} [{}]", r.title, r.status))
        .collect::<Vec<_>>()
        .join(", ")
}
