//! Recommendation-to-remediation pipeline.
//!
//! The pipeline observes cloud resources, derives actionable cost, security,
//! and performance recommendations, and can execute multi-step remediation
//! sequences against the provider.
//!
//! # Flow
//!
//! 1. [`engine::RecommendationEngine`] lists resources per kind, serving
//!    records inside their cooldown window straight from
//!    [`store::ResourceStore`] (first sight wins until cooldown elapses).
//! 2. On a cache miss, metrics and cost are pulled from the provider and a
//!    recommendation set is attached, from a static rule table
//!    ([`rules`]) or from a Bedrock model call whose output is defensively
//!    parsed ([`crate::bedrock`]).
//! 3. [`alerts::AlertProjector`] and [`findings::FindingsProjector`] derive
//!    flat, addressable views over recommendation state; both share the
//!    reversible composite-id codec.
//! 4. `optimize` hands each executable recommendation to
//!    [`remediation::RemediationExecutor`]; a recommendation resolves iff
//!    every step of its sequence succeeded.

// ============================================================================
// Core modules
// ============================================================================

/// Core data types.
pub mod types;

/// Idempotent resource persistence with cooldown tracking.
pub mod store;

/// Remediation step-sequence catalog.
pub mod commands;

/// Static per-kind rule tables.
pub mod rules;

// ============================================================================
// Orchestration and projections
// ============================================================================

/// Cache-first listing, derivation strategies, and the optimize pass.
pub mod engine;

/// Alert projection and the composite-id codec.
pub mod alerts;

/// Security-finding projection.
pub mod findings;

/// Projected-savings summary.
pub mod savings;

/// Placeholder resolution and ordered step execution.
pub mod remediation;

// ============================================================================
// Re-exports: core types
// ============================================================================

pub use types::{
    DerivationStrategy,
    Impact,
    ProviderOp,
    RecoStatus,
    RecoType,
    Recommendation,
    Resource,
    ResourceBatch,
    ResourceKey,
    ResourceKind,
    ResourceStatus,
    Severity,
    Step,
    sanitize_title,
};

// ============================================================================
// Re-exports: components
// ============================================================================

pub use alerts::{Alert, AlertProjector, decode_alert_id, encode_alert_id};
pub use engine::{EngineConfig, RecommendationEngine, StrategyMap};
pub use findings::{FindingsProjector, FindingsReport, FindingsSummary, SecurityFinding};
pub use remediation::{
    FailurePolicy, RemediationExecutor, RemediationOutcome, all_succeeded, bindings_for,
    resolve_command, resolve_placeholders,
};
pub use savings::{SavingsProjection, project_savings};
pub use store::{
    DEFAULT_COOLDOWN_SECONDS, JsonFileStore, MemoryStore, ResourceStore, StorageError,
    is_in_cooldown, is_in_cooldown_at,
};
