//! Configuration types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::bedrock::{ModelOptions, RetryPolicy};
use crate::pipeline::remediation::FailurePolicy;
use crate::pipeline::store::DEFAULT_COOLDOWN_SECONDS;
use crate::pipeline::types::DerivationStrategy;

/// Top-level configuration, loaded from `.cloudtrim.toml` with env-var
/// overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub model: ModelConfig,
    pub remediation: RemediationConfig,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Minimum interval before a resource's live data is re-fetched.
    pub cooldown_seconds: u64,
    pub region: String,
    /// Timeout for individual provider calls.
    pub provider_timeout_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
            region: "us-east-1".into(),
            provider_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub model_id: String,
    /// Tried once if the primary model fails with a gating error.
    pub fallback_model_id: Option<String>,
    /// Corrective retries after the initial attempt.
    pub max_retries: u32,
    pub initial_retry_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_id: "amazon.nova-micro-v1:0".into(),
            fallback_model_id: Some("meta.llama3-8b-instruct-v1:0".into()),
            max_retries: 2,
            initial_retry_delay_ms: 350,
            request_timeout_secs: 30,
        }
    }
}

impl ModelConfig {
    pub fn options(&self) -> ModelOptions {
        ModelOptions {
            model_id: self.model_id.clone(),
            fallback_model_id: self.fallback_model_id.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.initial_retry_delay_ms),
            ..RetryPolicy::default()
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RemediationConfig {
    pub failure_policy: FailurePolicy,
}

/// Per-kind derivation strategy. Compute follows the model by default; the
/// storage kinds derive from their rule tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub compute: DerivationStrategy,
    pub object_store: DerivationStrategy,
    pub table: DerivationStrategy,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            compute: DerivationStrategy::Model,
            object_store: DerivationStrategy::RuleTable,
            table: DerivationStrategy::RuleTable,
        }
    }
}

impl Config {
    /// Apply `CLOUDTRIM_*` environment overrides on top of file values.
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("CLOUDTRIM_MODEL") {
            self.model.model_id = model;
        }
        if let Ok(fallback) = std::env::var("CLOUDTRIM_FALLBACK_MODEL") {
            self.model.fallback_model_id = (!fallback.is_empty()).then_some(fallback);
        }
        if let Ok(region) = std::env::var("CLOUDTRIM_REGION") {
            self.general.region = region;
        }
        if let Ok(cooldown) = std::env::var("CLOUDTRIM_COOLDOWN_SECONDS") {
            if let Ok(parsed) = cooldown.parse() {
                self.general.cooldown_seconds = parsed;
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.general.cooldown_seconds, 86_400);
        assert_eq!(config.model.max_retries, 2);
        assert_eq!(config.strategy.compute, DerivationStrategy::Model);
        assert_eq!(config.strategy.table, DerivationStrategy::RuleTable);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [general]
            cooldown_seconds = 3600

            [strategy]
            compute = "rule_table"
            "#,
        )
        .unwrap();
        assert_eq!(config.general.cooldown_seconds, 3600);
        assert_eq!(config.general.region, "us-east-1");
        assert_eq!(config.strategy.compute, DerivationStrategy::RuleTable);
        assert_eq!(config.model.model_id, "amazon.nova-micro-v1:0");
    }
}
