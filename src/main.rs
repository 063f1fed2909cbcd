use clap::Parser;
use std::process;

use cloudtrim::cli::{Cli, Commands};
use cloudtrim::{config, handlers};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> cloudtrim::Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    let config = config::load_config(cli.config.as_deref())?;
    let engine = handlers::build_engine(&config, cli.state.clone(), cli.rules_only).await?;

    match cli.command {
        Commands::Resources { kind, json } => {
            handlers::resources::handle_resources(&engine, kind.map(Into::into), json).await
        }
        Commands::Show {
            resource_id,
            kind,
            json,
        } => handlers::resources::handle_show(&engine, &resource_id, kind.into(), json),
        Commands::Optimize { resource_id, kind } => {
            handlers::optimize::handle_optimize(&engine, &resource_id, kind.into()).await
        }
        Commands::Alerts { json } => handlers::alerts::handle_alerts(&engine, json),
        Commands::AlertStatus { alert_id, status } => {
            handlers::alerts::handle_alert_status(&engine, &alert_id, status.into())
        }
        Commands::Findings { json } => handlers::findings::handle_findings(&engine, json),
        Commands::Savings { json } => handlers::savings::handle_savings(&engine, json),
    }
}
