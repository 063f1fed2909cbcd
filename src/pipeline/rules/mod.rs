//! Static rule tables for recommendation derivation.
//!
//! Each rule inspects the facts gathered for one resource and either attaches
//! a recommendation or stays silent. Rules are registered per resource kind.

mod compute;
mod object_store;
mod table;

use crate::pipeline::types::{Recommendation, ResourceKind, ResourceStatus};
use crate::provider::{BucketSummary, TableSummary};

pub use compute::{DetailedMonitoringRule, RightSizeRule, StopIdleRule};
pub use object_store::{ArchiveColdDataRule, BlockPublicAccessRule, BucketEncryptionRule};
pub use table::{PointInTimeRecoveryRule, ProvisionedThroughputRule};

/// Facts available to a rule. Kind-specific summaries are present only for
/// the matching kind.
pub struct RuleContext<'a> {
    pub resource_id: &'a str,
    pub kind: ResourceKind,
    pub status: ResourceStatus,
    pub utilization: f64,
    pub monthly_cost: f64,
    pub region: &'a str,
    pub bucket: Option<&'a BucketSummary>,
    pub table: Option<&'a TableSummary>,
}

/// One entry in a kind's rule table.
pub trait RecommendationRule: Send + Sync {
    /// Stable rule name for logging.
    fn name(&self) -> &'static str;

    /// Attach a recommendation when the rule applies.
    fn check(&self, ctx: &RuleContext<'_>) -> Option<Recommendation>;
}

/// The rule table for one resource kind.
pub fn rules_for(kind: ResourceKind) -> Vec<Box<dyn RecommendationRule>> {
    match kind {
        ResourceKind::Compute => vec![
            Box::new(RightSizeRule),
            Box::new(StopIdleRule),
            Box::new(DetailedMonitoringRule),
        ],
        ResourceKind::ObjectStore => vec![
            Box::new(BlockPublicAccessRule),
            Box::new(BucketEncryptionRule),
            Box::new(ArchiveColdDataRule),
        ],
        ResourceKind::Table => vec![
            Box::new(ProvisionedThroughputRule),
            Box::new(PointInTimeRecoveryRule),
        ],
    }
}

/// Run the kind's table over the context and collect everything that fires.
pub fn derive_recommendations(ctx: &RuleContext<'_>) -> Vec<Recommendation> {
    let mut out = Vec::new();
    for rule in rules_for(ctx.kind) {
        if let Some(reco) = rule.check(ctx) {
            log::debug!("rule {} fired for {}", rule.name(), ctx.resource_id);
            out.push(reco);
        }
    }
    out
}

#[cfg(test)]
pub(crate) fn compute_ctx(
    resource_id: &str,
    status: ResourceStatus,
    utilization: f64,
    monthly_cost: f64,
) -> RuleContext<'_> {
    RuleContext {
        resource_id,
        kind: ResourceKind::Compute,
        status,
        utilization,
        monthly_cost,
        region: "us-east-1",
        bucket: None,
        table: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_instance_attaches_nothing() {
        let ctx = compute_ctx("i-1", ResourceStatus::Running, 45.0, 100.0);
        assert!(derive_recommendations(&ctx).is_empty());
    }

    #[test]
    fn underutilized_instance_gets_right_size() {
        let ctx = compute_ctx("i-1", ResourceStatus::Running, 4.0, 90.0);
        let recos = derive_recommendations(&ctx);
        assert_eq!(recos.len(), 1);
        assert_eq!(recos[0].title, "Right-size");
    }
}
