//! Rule table for compute instances.

use super::{RecommendationRule, RuleContext};
use crate::pipeline::commands;
use crate::pipeline::types::{Impact, RecoType, Recommendation, ResourceStatus, Severity};

/// Utilization below this marks a running instance as over-provisioned.
const RIGHT_SIZE_UTILIZATION_PCT: f64 = 10.0;
/// Utilization above this suggests the instance is running hot.
const HOT_UTILIZATION_PCT: f64 = 80.0;
/// Share of the monthly cost a downsize typically recovers.
const RIGHT_SIZE_SAVING_SHARE: f64 = 0.4;

const DOWNSIZE_TARGET: &str = "t3.small";

/// Running instance with persistently low CPU: downsize it.
pub struct RightSizeRule;

impl RecommendationRule for RightSizeRule {
    fn name(&self) -> &'static str {
        "compute/right-size"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<Recommendation> {
        if ctx.status != ResourceStatus::Running || ctx.utilization >= RIGHT_SIZE_UTILIZATION_PCT {
            return None;
        }
        Some(Recommendation::new(
            "Right-size",
            format!(
                "Instance runs at {:.0}% CPU; a {DOWNSIZE_TARGET} covers this load at a fraction of the cost.",
                ctx.utilization
            ),
            RecoType::Cost,
            Severity::Warning,
            format!(
                "Instance {} utilization {:.0}% is below the {RIGHT_SIZE_UTILIZATION_PCT:.0}% right-sizing threshold",
                ctx.resource_id, ctx.utilization
            ),
            Impact::High,
            Some(ctx.monthly_cost * RIGHT_SIZE_SAVING_SHARE),
            commands::resize_instance_steps(DOWNSIZE_TARGET),
        ))
    }
}

/// Instance the provider already reports as idle: stop it.
pub struct StopIdleRule;

impl RecommendationRule for StopIdleRule {
    fn name(&self) -> &'static str {
        "compute/stop-idle"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<Recommendation> {
        if ctx.status != ResourceStatus::Idle {
            return None;
        }
        Some(Recommendation::new(
            "Stop idle instance",
            "Instance is idle; stopping it eliminates its compute charge entirely.",
            RecoType::Cost,
            Severity::High,
            format!("Instance {} is idle", ctx.resource_id),
            Impact::Medium,
            Some(ctx.monthly_cost),
            commands::stop_instance_steps(),
        ))
    }
}

/// Hot instance without headroom visibility: enable detailed monitoring.
pub struct DetailedMonitoringRule;

impl RecommendationRule for DetailedMonitoringRule {
    fn name(&self) -> &'static str {
        "compute/detailed-monitoring"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<Recommendation> {
        if ctx.status != ResourceStatus::Running || ctx.utilization <= HOT_UTILIZATION_PCT {
            return None;
        }
        Some(Recommendation::new(
            "Enable detailed monitoring",
            format!(
                "Instance runs at {:.0}% CPU; one-minute metrics catch saturation before it degrades service.",
                ctx.utilization
            ),
            RecoType::Performance,
            Severity::Info,
            format!(
                "Instance {} utilization {:.0}% exceeds {HOT_UTILIZATION_PCT:.0}%",
                ctx.resource_id, ctx.utilization
            ),
            Impact::Low,
            None,
            commands::enable_monitoring_steps(),
        ))
    }
}
