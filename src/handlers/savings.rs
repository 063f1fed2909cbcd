//! Handler for the `savings` command.

use std::sync::Arc;

use super::Engine;
use crate::error::Result;
use crate::pipeline::savings::project_savings;
use crate::pipeline::store::ResourceStore;

/// Handle the `savings` command: project savings from current
/// recommendation state.
pub fn handle_savings(engine: &Engine, json: bool) -> Result<()> {
    let store = Arc::clone(engine.store());
    let resources = store.list_all()?;
    let projection = project_savings(&resources);

    if json {
        println!("{}", serde_json::to_string_pretty(&projection)?);
        return Ok(());
    }

    println!("💰 Projected savings");
    println!("  monthly:  ${:.2}", projection.monthly);
    println!("  yearly:   ${:.2}", projection.yearly);
    println!("  realized: ${:.2}/mo", projection.realized_monthly);
    println!("  optimization score: {}/100", projection.optimization_score);
    Ok(())
}
