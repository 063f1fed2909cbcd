//! Rule table for key-value tables.

use super::{RecommendationRule, RuleContext};
use crate::pipeline::commands;
use crate::pipeline::types::{Impact, RecoType, Recommendation, Severity};

/// Consumed-capacity share below which provisioned throughput is halved.
const THROUGHPUT_UTILIZATION_PCT: f64 = 20.0;
/// Share of the monthly cost a throughput halving typically recovers.
const THROUGHPUT_SAVING_SHARE: f64 = 0.35;

/// Provisioned table with mostly unused capacity: halve the throughput.
pub struct ProvisionedThroughputRule;

impl RecommendationRule for ProvisionedThroughputRule {
    fn name(&self) -> &'static str {
        "table/reduce-throughput"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<Recommendation> {
        let table = ctx.table?;
        if table.billing_mode != "PROVISIONED" || ctx.utilization >= THROUGHPUT_UTILIZATION_PCT {
            return None;
        }
        let read = table.provisioned_read_units.unwrap_or(5).div_ceil(2).max(1);
        let write = table.provisioned_write_units.unwrap_or(5).div_ceil(2).max(1);
        Some(Recommendation::new(
            "Reduce provisioned throughput",
            format!(
                "Table consumes {:.0}% of its provisioned capacity; halving to {read} read / {write} write units keeps ample headroom.",
                ctx.utilization
            ),
            RecoType::Cost,
            Severity::Warning,
            format!(
                "Table {} capacity utilization {:.0}% is below {THROUGHPUT_UTILIZATION_PCT:.0}%",
                ctx.resource_id, ctx.utilization
            ),
            Impact::Medium,
            Some(ctx.monthly_cost * THROUGHPUT_SAVING_SHARE),
            commands::reduce_throughput_steps(read, write),
        ))
    }
}

/// Table without point-in-time recovery.
pub struct PointInTimeRecoveryRule;

impl RecommendationRule for PointInTimeRecoveryRule {
    fn name(&self) -> &'static str {
        "table/enable-pitr"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<Recommendation> {
        let table = ctx.table?;
        if table.point_in_time_recovery {
            return None;
        }
        Some(Recommendation::new(
            "Enable point-in-time recovery",
            "Continuous backups are disabled; accidental writes or deletes cannot be rolled back.",
            RecoType::Security,
            Severity::High,
            format!("Table {} has point-in-time recovery disabled", ctx.resource_id),
            Impact::Low,
            None,
            commands::enable_pitr_steps(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{ResourceKind, ResourceStatus};
    use crate::provider::TableSummary;

    fn table(billing: &str, read: u64, pitr: bool) -> TableSummary {
        TableSummary {
            name: "sessions".into(),
            region: "us-east-1".into(),
            billing_mode: billing.into(),
            provisioned_read_units: Some(read),
            provisioned_write_units: Some(read),
            point_in_time_recovery: pitr,
        }
    }

    fn ctx<'a>(t: &'a TableSummary, utilization: f64) -> RuleContext<'a> {
        RuleContext {
            resource_id: &t.name,
            kind: ResourceKind::Table,
            status: ResourceStatus::Running,
            utilization,
            monthly_cost: 58.0,
            region: &t.region,
            bucket: None,
            table: Some(t),
        }
    }

    #[test]
    fn throughput_rule_halves_capacity() {
        let t = table("PROVISIONED", 100, true);
        let reco = ProvisionedThroughputRule.check(&ctx(&t, 12.0)).unwrap();
        let params = &reco.solution_steps[0]
            .provider_operation
            .as_ref()
            .unwrap()
            .params;
        assert_eq!(params["ProvisionedThroughput"]["ReadCapacityUnits"], 50);
    }

    #[test]
    fn on_demand_tables_are_ignored() {
        let t = table("PAY_PER_REQUEST", 100, true);
        assert!(ProvisionedThroughputRule.check(&ctx(&t, 1.0)).is_none());
    }

    #[test]
    fn pitr_rule_fires_when_disabled() {
        let t = table("PROVISIONED", 100, false);
        assert!(PointInTimeRecoveryRule.check(&ctx(&t, 50.0)).is_some());
        let protected = table("PROVISIONED", 100, true);
        assert!(PointInTimeRecoveryRule.check(&ctx(&protected, 50.0)).is_none());
    }
}
