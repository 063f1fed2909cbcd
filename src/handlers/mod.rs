//! Handlers for the CLI commands.
//!
//! Each handler builds the pipeline stack (file-backed store, demo provider
//! inventory, Bedrock model gateway), invokes the engine or a projection,
//! and renders the result.

pub mod alerts;
pub mod findings;
pub mod optimize;
pub mod resources;
pub mod savings;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::bedrock::{BedrockModelGateway, ModelRecommender};
use crate::config::types::Config;
use crate::config::default_state_path;
use crate::error::Result;
use crate::pipeline::engine::{EngineConfig, RecommendationEngine, StrategyMap};
use crate::pipeline::store::JsonFileStore;
use crate::provider::DemoProvider;

pub type Engine = RecommendationEngine<JsonFileStore, DemoProvider, BedrockModelGateway>;

/// Assemble the pipeline stack from configuration.
pub async fn build_engine(
    config: &Config,
    state_path: Option<PathBuf>,
    rules_only: bool,
) -> Result<Engine> {
    let store = Arc::new(JsonFileStore::open(
        state_path.unwrap_or_else(default_state_path),
    )?);
    let provider = Arc::new(DemoProvider::new(config.general.region.as_str()));
    let gateway = BedrockModelGateway::connect(&config.general.region).await;
    let recommender = Arc::new(ModelRecommender::new(
        gateway,
        config.model.options(),
        config.model.retry_policy(),
    ));

    let strategies = if rules_only {
        StrategyMap::rules_only()
    } else {
        StrategyMap {
            compute: config.strategy.compute,
            object_store: config.strategy.object_store,
            table: config.strategy.table,
        }
    };

    Ok(RecommendationEngine::new(
        store,
        provider,
        recommender,
        EngineConfig {
            cooldown_seconds: config.general.cooldown_seconds,
            provider_timeout: Duration::from_secs(config.general.provider_timeout_secs),
            failure_policy: config.remediation.failure_policy,
            strategies,
            provider_name: "AWS".into(),
        },
    ))
}
