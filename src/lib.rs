//! # Cloudtrim
//!
//! A Rust-based CLI that observes cloud resources (compute instances,
//! object-storage buckets, key-value tables), derives actionable
//! cost/security/performance recommendations, and executes multi-step
//! remediation sequences against the provider.
//!
//! ## Features
//!
//! - **Cache-first observation**: resource snapshots persist with a cooldown;
//!   fresh records are served without re-querying the provider
//! - **Two derivation strategies**: static per-kind rule tables, or an AWS
//!   Bedrock model call with defensive JSON extraction and bounded retries
//! - **Addressable projections**: alerts and security findings derived from
//!   recommendation state, with a reversible composite-id encoding
//! - **Remediation**: placeholder-resolved, ordered step sequences with
//!   per-step outcome aggregation and a configurable failure policy
//!
//! ## Example
//!
//! ```rust,no_run
//! use cloudtrim::pipeline::{
//!     AlertProjector, EngineConfig, MemoryStore, RecommendationEngine, ResourceKind,
//!     StrategyMap,
//! };
//! use cloudtrim::bedrock::{BedrockModelGateway, ModelOptions, ModelRecommender, RetryPolicy};
//! use cloudtrim::provider::DemoProvider;
//! use std::sync::Arc;
//!
//! # async fn run() -> cloudtrim::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let provider = Arc::new(DemoProvider::new("us-east-1"));
//! let gateway = BedrockModelGateway::connect("us-east-1").await;
//! let recommender = Arc::new(ModelRecommender::new(
//!     gateway,
//!     ModelOptions::default(),
//!     RetryPolicy::default(),
//! ));
//!
//! let engine = RecommendationEngine::new(store.clone(), provider, recommender, EngineConfig {
//!     strategies: StrategyMap::rules_only(),
//!     ..EngineConfig::default()
//! });
//! let batch = engine.list_resources(ResourceKind::Compute).await?;
//! println!("{} resources, {} idle", batch.resources.len(), batch.idle);
//!
//! let alerts = AlertProjector::new(store).list_alerts()?;
//! println!("{} active alerts", alerts.len());
//! # Ok(())
//! # }
//! ```

pub mod bedrock;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod pipeline;
pub mod provider;

// Re-export commonly used types and functions
pub use error::{CloudTrimError, Result};
pub use pipeline::{
    Alert, AlertProjector, RecommendationEngine, Resource, ResourceKind, decode_alert_id,
    encode_alert_id,
};

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
