//! Handler for the `optimize` command.

use colored::Colorize;

use super::Engine;
use crate::error::Result;
use crate::pipeline::types::{RecoStatus, ResourceKind};

/// Handle the `optimize` command: run every executable recommendation's
/// sequence and report the per-recommendation outcome.
pub async fn handle_optimize(engine: &Engine, resource_id: &str, kind: ResourceKind) -> Result<()> {
    println!("⚙️  Optimizing {kind}/{resource_id}...");
    let resource = engine.optimize(resource_id, kind).await?;

    println!(
        "Resource status: {} (pass attempted; inspect each recommendation for the real outcome)",
        resource.status.to_string().cyan()
    );
    for reco in &resource.recommendations {
        let marker = match reco.status {
            RecoStatus::Resolved => "✅ resolved".green().to_string(),
            RecoStatus::Active => "⚠️  still active".yellow().to_string(),
            RecoStatus::Suppressed => "suppressed".dimmed().to_string(),
        };
        println!("  {} - {marker}", reco.title);
    }
    Ok(())
}
