//! Projected-savings summary derived from current recommendation state.
//!
//! Computed per request from the resources passed in; no stored state.

use serde::{Deserialize, Serialize};

use super::types::{RecoStatus, RecoType, Resource};

/// Cap on the optimization score; there is always something left to tune.
const MAX_SCORE: u32 = 95;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavingsProjection {
    /// Monthly savings still on the table (active cost recommendations).
    pub monthly: f64,
    pub yearly: f64,
    /// Monthly savings already realized (resolved cost recommendations).
    pub realized_monthly: f64,
    /// Share of identified savings already realized, capped at 95.
    pub optimization_score: u32,
}

/// Sum cost-recommendation savings across the fleet.
pub fn project_savings(resources: &[Resource]) -> SavingsProjection {
    let mut pending = 0.0;
    let mut realized = 0.0;

    for resource in resources {
        for reco in &resource.recommendations {
            if reco.reco_type != RecoType::Cost {
                continue;
            }
            let Some(saving) = reco.saving else { continue };
            match reco.status {
                RecoStatus::Active => pending += saving,
                RecoStatus::Resolved => realized += saving,
                RecoStatus::Suppressed => {}
            }
        }
    }

    let total = pending + realized;
    let score = if total > 0.0 {
        (((realized / total) * 100.0).round() as u32).min(MAX_SCORE)
    } else {
        0
    };

    SavingsProjection {
        monthly: (pending * 100.0).round() / 100.0,
        yearly: (pending * 12.0 * 100.0).round() / 100.0,
        realized_monthly: (realized * 100.0).round() / 100.0,
        optimization_score: score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{
        Impact, RecoType, Recommendation, ResourceKind, ResourceStatus, Severity,
    };
    use chrono::Utc;

    fn resource(recos: Vec<Recommendation>) -> Resource {
        Resource {
            resource_id: "i-001".into(),
            resource_type: ResourceKind::Compute,
            name: "i-001".into(),
            provider: "AWS".into(),
            region: "us-east-1".into(),
            status: ResourceStatus::Running,
            utilization: 4.0,
            monthly_cost: 90.0,
            is_optimized: false,
            recommendations: recos,
            last_checked_time: Utc::now(),
            last_activity: None,
            cooldown_seconds: 86400,
        }
    }

    fn reco(reco_type: RecoType, status: RecoStatus, saving: Option<f64>, title: &str) -> Recommendation {
        let mut r = Recommendation::new(
            title,
            "d",
            reco_type,
            Severity::Warning,
            "i",
            Impact::Medium,
            saving,
            vec![],
        );
        r.status = status;
        r
    }

    #[test]
    fn only_cost_savings_count() {
        let projection = project_savings(&[resource(vec![
            reco(RecoType::Cost, RecoStatus::Active, Some(36.0), "Right-size"),
            reco(RecoType::Security, RecoStatus::Active, Some(99.0), "Block Public Access"),
            reco(RecoType::Cost, RecoStatus::Resolved, Some(12.0), "Stop idle instance"),
            reco(RecoType::Cost, RecoStatus::Suppressed, Some(50.0), "Archive old data"),
            reco(RecoType::Cost, RecoStatus::Active, None, "Monitor usage"),
        ])]);
        assert_eq!(projection.monthly, 36.0);
        assert_eq!(projection.yearly, 432.0);
        assert_eq!(projection.realized_monthly, 12.0);
        assert_eq!(projection.optimization_score, 25);
    }

    #[test]
    fn empty_fleet_scores_zero() {
        let projection = project_savings(&[]);
        assert_eq!(projection.optimization_score, 0);
        assert_eq!(projection.monthly, 0.0);
    }

    #[test]
    fn score_is_capped() {
        let projection = project_savings(&[resource(vec![reco(
            RecoType::Cost,
            RecoStatus::Resolved,
            Some(100.0),
            "Right-size",
        )])]);
        assert_eq!(projection.optimization_score, 95);
    }
}
