//! Provider gateway contract.
//!
//! Typed calls against the cloud provider's compute/storage/table APIs plus a
//! generic `invoke` used by the remediation executor. Implementations wrap the
//! actual provider SDKs; the pipeline only depends on this trait, so tests and
//! the bundled demo inventory can stand in for live infrastructure.

pub mod demo;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use demo::DemoProvider;

/// Provider call failures. `Client` is a provider-reported failure (bad
/// request, unknown operation, denied); the other variants are transport
/// problems and are candidates for retry.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider client error [{code}]: {message}")]
    Client { code: String, message: String },

    #[error("provider transport error: {0}")]
    Transport(String),

    #[error("provider call timed out after {0}s")]
    Timeout(u64),
}

impl ProviderError {
    pub fn client(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Client {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Transport and timeout failures may be retried; client errors not.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Client { .. })
    }
}

/// A compute instance as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeInstance {
    pub instance_id: String,
    pub name: String,
    /// Provider state name ("running", "stopped", ...).
    pub state: String,
    pub instance_type: String,
    pub region: String,
    pub launch_time: Option<DateTime<Utc>>,
}

/// An object-storage bucket summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketSummary {
    pub name: String,
    pub region: String,
    pub public_access_blocked: bool,
    pub encryption_enabled: bool,
    pub lifecycle_configured: bool,
}

/// A key-value table summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    pub region: String,
    /// "PROVISIONED" or "PAY_PER_REQUEST".
    pub billing_mode: String,
    pub provisioned_read_units: Option<u64>,
    pub provisioned_write_units: Option<u64>,
    pub point_in_time_recovery: bool,
}

/// A metric lookup request.
#[derive(Debug, Clone)]
pub struct MetricQuery {
    pub namespace: String,
    pub name: String,
    /// Dimension name/value pairs, e.g. `("InstanceId", "i-001")`.
    pub dimensions: Vec<(String, String)>,
    pub period_seconds: u32,
    /// Statistic to aggregate ("Average", "Maximum", ...).
    pub stat: String,
}

impl MetricQuery {
    /// Average CPU utilization for one compute instance over 5-minute
    /// periods.
    pub fn cpu_utilization(instance_id: &str) -> Self {
        Self {
            namespace: "AWS/EC2".into(),
            name: "CPUUtilization".into(),
            dimensions: vec![("InstanceId".into(), instance_id.into())],
            period_seconds: 300,
            stat: "Average".into(),
        }
    }
}

/// Gateway to the cloud provider. Pure I/O adapter; carries no pipeline
/// state.
#[allow(async_fn_in_trait)]
pub trait ProviderGateway: Send + Sync {
    async fn describe_instances(&self) -> Result<Vec<ComputeInstance>, ProviderError>;

    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, ProviderError>;

    async fn list_tables(&self) -> Result<Vec<TableSummary>, ProviderError>;

    /// Latest datapoint for the query, if the provider has one.
    async fn get_metric(&self, query: &MetricQuery) -> Result<Option<f64>, ProviderError>;

    /// Monthly cost attributed to a tag pair, if cost data exists.
    async fn get_cost_for_tag(&self, key: &str, value: &str)
    -> Result<Option<f64>, ProviderError>;

    /// Generic dispatch used by remediation steps. Unknown services or
    /// operations surface as `ProviderError::Client`.
    async fn invoke(
        &self,
        service: &str,
        operation: &str,
        params: &serde_json::Value,
    ) -> Result<serde_json::Value, ProviderError>;
}
