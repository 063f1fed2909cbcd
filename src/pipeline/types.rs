//! Core types for the recommendation-to-remediation pipeline.
//!
//! These types represent observed cloud resources, the recommendations
//! attached to them, and the remediation step sequences that can be executed
//! against the provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// ============================================================================
// Resource kind
// ============================================================================

/// The kinds of cloud resources tracked by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Compute instance (EC2 and friends)
    Compute,
    /// Object-storage bucket (S3 and friends)
    ObjectStore,
    /// Key-value table (DynamoDB and friends)
    Table,
}

impl ResourceKind {
    /// All supported kinds, in listing order.
    pub const ALL: [ResourceKind; 3] = [Self::Compute, Self::ObjectStore, Self::Table];

    /// Parse a kind from a string (case-insensitive). Accepts both the
    /// canonical names and the AWS service aliases used by older records.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "compute" | "ec2" | "instance" => Some(Self::Compute),
            "object_store" | "object-store" | "s3" | "bucket" => Some(Self::ObjectStore),
            "table" | "dynamodb" => Some(Self::Table),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compute => "compute",
            Self::ObjectStore => "object_store",
            Self::Table => "table",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Resource status
// ============================================================================

/// Lifecycle status of an observed resource. Soft states only; records are
/// never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Running,
    Stopped,
    Idle,
    Optimized,
    #[default]
    Unknown,
}

impl ResourceStatus {
    /// Map a provider-reported state name onto a status.
    pub fn from_provider_state(state: &str) -> Self {
        match state.to_lowercase().as_str() {
            "running" | "available" | "active" => Self::Running,
            "stopped" | "stopping" | "terminated" => Self::Stopped,
            "idle" => Self::Idle,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Idle => "idle",
            Self::Optimized => "optimized",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Recommendation classification
// ============================================================================

/// Category of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoType {
    Cost,
    Security,
    Performance,
}

impl RecoType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cost => "cost",
            Self::Security => "security",
            Self::Performance => "performance",
        }
    }
}

impl fmt::Display for RecoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity levels for recommendations and the alerts projected from them.
///
/// Ordered from most severe to least severe:
/// `Critical > High > Warning > Info`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Warning,
    Info,
}

impl Severity {
    /// Parse a severity from a string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "warning" => Some(Self::Warning),
            "info" => Some(Self::Info),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Warning => 2,
            Self::Info => 3,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse so Critical > High > Warning > Info
        other.rank().cmp(&self.rank())
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Expected blast radius of applying a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    #[default]
    Medium,
    High,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoStatus {
    #[default]
    Active,
    Resolved,
    Suppressed,
}

impl RecoStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(Self::Active),
            "resolved" => Some(Self::Resolved),
            "suppressed" => Some(Self::Suppressed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Resolved => "resolved",
            Self::Suppressed => "suppressed",
        }
    }
}

impl fmt::Display for RecoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Remediation steps
// ============================================================================

/// A provider-level operation template embedded in a remediation step.
///
/// `params` is a template tree: any string inside it may carry
/// `{placeholder}` tokens resolved against concrete bindings at execution
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderOp {
    pub service: String,
    pub operation: String,
    pub params: serde_json::Value,
}

/// One ordered step within a recommendation's fix sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based position within the sequence. Later steps may depend on
    /// earlier ones (stop before modify before start).
    pub order: u32,
    /// Human-readable CLI command template with `{placeholder}` tokens.
    pub human_command: String,
    /// Machine-executable provider operation; `None` for advisory steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_operation: Option<ProviderOp>,
}

impl Step {
    pub fn new(order: u32, human_command: impl Into<String>, op: Option<ProviderOp>) -> Self {
        Self {
            order,
            human_command: human_command.into(),
            provider_operation: op,
        }
    }
}

// ============================================================================
// Recommendation
// ============================================================================

/// Characters reserved by the alert-id encoding. Titles must never contain
/// them; `sanitize_title` strips them at creation.
pub const RESERVED_TITLE_CHARS: [char; 2] = [':', '~'];

/// Replace reserved alert-id characters in a title with `-`.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if RESERVED_TITLE_CHARS.contains(&c) { '-' } else { c })
        .collect()
}

/// A single actionable finding attached to a resource.
///
/// The title is unique within its resource (case-insensitive) and acts as
/// the stable sub-key for status updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub reco_type: RecoType,
    pub severity: Severity,
    /// Short statement of the underlying issue.
    pub issue: String,
    pub impact: Impact,
    /// Estimated monthly saving in USD; `None` renders as "N/A".
    #[serde(default)]
    pub saving: Option<f64>,
    #[serde(default)]
    pub status: RecoStatus,
    pub solution_steps: Vec<Step>,
}

impl Recommendation {
    /// Create an active recommendation with a sanitized title.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        reco_type: RecoType,
        severity: Severity,
        issue: impl Into<String>,
        impact: Impact,
        saving: Option<f64>,
        solution_steps: Vec<Step>,
    ) -> Self {
        Self {
            title: sanitize_title(&title.into()),
            description: description.into(),
            reco_type,
            severity,
            issue: issue.into(),
            impact,
            saving,
            status: RecoStatus::Active,
            solution_steps,
        }
    }

    /// A sequence is executable when it is non-empty and every step carries a
    /// provider operation. Advisory-only sequences are skipped by the
    /// optimizer.
    pub fn is_executable(&self) -> bool {
        !self.solution_steps.is_empty()
            && self
                .solution_steps
                .iter()
                .all(|s| s.provider_operation.is_some())
    }

    /// Render the saving for display.
    pub fn saving_display(&self) -> String {
        match self.saving {
            Some(v) => format!("${v:.2}"),
            None => "N/A".to_string(),
        }
    }
}

// ============================================================================
// Resource
// ============================================================================

/// Composite identity of a resource record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub resource_id: String,
    pub kind: ResourceKind,
}

impl ResourceKey {
    pub fn new(resource_id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            resource_id: resource_id.into(),
            kind,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.resource_id)
    }
}

/// An observed cloud asset with its recommendation set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub resource_id: String,
    pub resource_type: ResourceKind,
    pub name: String,
    pub provider: String,
    pub region: String,
    pub status: ResourceStatus,
    /// Utilization percentage, clamped to 0-100 at the store boundary.
    pub utilization: f64,
    /// Monthly cost in USD, normalized to cents at the store boundary.
    pub monthly_cost: f64,
    pub is_optimized: bool,
    pub recommendations: Vec<Recommendation>,
    pub last_checked_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
    pub cooldown_seconds: u64,
}

impl Resource {
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(self.resource_id.clone(), self.resource_type)
    }

    /// Find a recommendation by exact case-insensitive title match.
    pub fn recommendation_mut(&mut self, title: &str) -> Option<&mut Recommendation> {
        self.recommendations
            .iter_mut()
            .find(|r| r.title.eq_ignore_ascii_case(title))
    }
}

// ============================================================================
// Listing batches
// ============================================================================

/// One listing result per resource kind. The running/idle tallies are
/// computed from the batch itself rather than kept as cross-request state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceBatch {
    pub resources: Vec<Resource>,
    pub running: usize,
    pub idle: usize,
}

impl ResourceBatch {
    /// Utilization below this counts a running resource as idle.
    pub const IDLE_UTILIZATION_PCT: f64 = 5.0;

    pub fn from_resources(resources: Vec<Resource>) -> Self {
        let running = resources
            .iter()
            .filter(|r| r.status == ResourceStatus::Running)
            .count();
        let idle = resources
            .iter()
            .filter(|r| {
                r.status == ResourceStatus::Idle
                    || (r.status == ResourceStatus::Running
                        && r.utilization < Self::IDLE_UTILIZATION_PCT)
            })
            .count();
        Self {
            resources,
            running,
            idle,
        }
    }
}

/// How a kind's recommendation set is derived on a cache miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivationStrategy {
    /// Static per-kind rule table.
    #[default]
    RuleTable,
    /// Language-model call with defensive parsing.
    Model,
}
