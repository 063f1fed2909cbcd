//! Security-finding projection.
//!
//! A filtered view of security-type recommendations across all resources,
//! with a severity/status summary. Findings share the alert id encoding, so
//! a finding id round-trips through the same codec and status updates route
//! through the same recommendation transition.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::alerts::{AlertProjector, encode_alert_id};
use super::store::ResourceStore;
use super::types::{RecoStatus, RecoType, Resource, Severity};
use crate::error::Result;

/// One security finding, addressable by the composite alert id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityFinding {
    pub id: String,
    pub title: String,
    pub severity: Severity,
    pub description: String,
    pub resource: String,
    /// First remediation command, as a human-readable hint.
    pub remediation: String,
    pub status: RecoStatus,
}

/// Tally of findings by severity and status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingsSummary {
    pub critical: usize,
    pub high: usize,
    pub warning: usize,
    pub info: usize,
    pub open: usize,
    pub resolved: usize,
    pub suppressed: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingsReport {
    pub findings: Vec<SecurityFinding>,
    pub summary: FindingsSummary,
}

/// Derives the security-finding view. Status updates are delegated to the
/// alert projector since findings and alerts share the id encoding.
pub struct FindingsProjector<S> {
    store: Arc<S>,
    alerts: AlertProjector<S>,
}

impl<S: ResourceStore> FindingsProjector<S> {
    pub fn new(store: Arc<S>) -> Self {
        let alerts = AlertProjector::new(store.clone());
        Self { store, alerts }
    }

    /// All security-type recommendations, any status, most severe first.
    pub fn list_findings(&self) -> Result<FindingsReport> {
        let mut findings = Vec::new();
        let mut summary = FindingsSummary::default();

        for resource in self.store.list_all()? {
            for reco in &resource.recommendations {
                if reco.reco_type != RecoType::Security {
                    continue;
                }
                severity_slot(&mut summary, reco.severity);
                match reco.status {
                    RecoStatus::Active => summary.open += 1,
                    RecoStatus::Resolved => summary.resolved += 1,
                    RecoStatus::Suppressed => summary.suppressed += 1,
                }
                findings.push(SecurityFinding {
                    id: encode_alert_id(&resource.resource_id, &reco.title)?,
                    title: reco.title.clone(),
                    severity: reco.severity,
                    description: reco.description.clone(),
                    resource: resource.resource_id.clone(),
                    remediation: reco
                        .solution_steps
                        .first()
                        .map(|s| s.human_command.clone())
                        .unwrap_or_else(|| reco.description.clone()),
                    status: reco.status,
                });
            }
        }

        findings.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.id.cmp(&b.id)));
        Ok(FindingsReport { findings, summary })
    }

    /// Update the finding's underlying recommendation status.
    pub fn set_finding_status(&self, id: &str, status: RecoStatus) -> Result<Resource> {
        self.alerts.set_alert_status(id, status)
    }
}

fn severity_slot(summary: &mut FindingsSummary, severity: Severity) {
    match severity {
        Severity::Critical => summary.critical += 1,
        Severity::High => summary.high += 1,
        Severity::Warning => summary.warning += 1,
        Severity::Info => summary.info += 1,
    }
}
