//! Alert projection over recommendation state.
//!
//! Alerts are a view, never a record: every call recomputes them from the
//! current resources, so they are always consistent with recommendation
//! state by construction. The composite alert id encodes
//! `(resource_id, recommendation_title)` reversibly:
//!
//! - `id = resource_id + ':' + title_with_spaces_as_'~'`
//! - titles are sanitized at creation to contain neither `:` nor `~`, and
//!   resource ids must not contain `:`
//!
//! which makes the encoding collision-free and `decode(encode(x)) == x`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::store::ResourceStore;
use super::types::{
    Impact, RecoStatus, RecoType, Recommendation, Resource, ResourceKind, Severity,
};
use crate::error::{CloudTrimError, Result};

/// Separator between resource id and title slug.
pub const ID_SEPARATOR: char = ':';
/// Stand-in for spaces inside the title slug.
pub const SLUG_SPACE: char = '~';

/// Encode a composite alert id. Fails if either part contains a reserved
/// character; the separator choice is only safe because creation enforces
/// this.
pub fn encode_alert_id(resource_id: &str, title: &str) -> Result<String> {
    if resource_id.is_empty() || resource_id.contains(ID_SEPARATOR) {
        return Err(CloudTrimError::Validation(format!(
            "resource id '{resource_id}' cannot carry an alert id"
        )));
    }
    if title.is_empty() || title.contains(ID_SEPARATOR) || title.contains(SLUG_SPACE) {
        return Err(CloudTrimError::Validation(format!(
            "recommendation title '{title}' contains reserved characters"
        )));
    }
    let slug = title.replace(' ', &SLUG_SPACE.to_string());
    Ok(format!("{resource_id}{ID_SEPARATOR}{slug}"))
}

/// Decode a composite alert id back into `(resource_id, title)`.
pub fn decode_alert_id(id: &str) -> Result<(String, String)> {
    let (resource_id, slug) = id
        .split_once(ID_SEPARATOR)
        .ok_or_else(|| CloudTrimError::Validation(format!("malformed alert id '{id}'")))?;
    if resource_id.is_empty() || slug.is_empty() {
        return Err(CloudTrimError::Validation(format!(
            "malformed alert id '{id}'"
        )));
    }
    let title = slug.replace(SLUG_SPACE, " ");
    Ok((resource_id.to_string(), title))
}

/// A read-only projection of one active recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    /// Recommendation category ("cost", "security", "performance").
    pub source: RecoType,
    pub affected_resources: Vec<String>,
    pub status: RecoStatus,
    pub impact: Impact,
    pub saving: Option<f64>,
    pub resource_type: ResourceKind,
    pub region: String,
    pub timestamp: DateTime<Utc>,
}

fn project(resource: &Resource, reco: &Recommendation) -> Result<Alert> {
    Ok(Alert {
        id: encode_alert_id(&resource.resource_id, &reco.title)?,
        title: reco.title.clone(),
        message: reco.issue.clone(),
        severity: reco.severity,
        source: reco.reco_type,
        affected_resources: vec![resource.resource_id.clone()],
        status: reco.status,
        impact: reco.impact,
        saving: reco.saving,
        resource_type: resource.resource_type,
        region: resource.region.clone(),
        timestamp: resource.last_checked_time,
    })
}

/// Derives the alert view and routes status transitions back onto the
/// owning recommendation.
pub struct AlertProjector<S> {
    store: Arc<S>,
}

impl<S: ResourceStore> AlertProjector<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// One alert per resource × active recommendation, recomputed on every
    /// call. Most severe first.
    pub fn list_alerts(&self) -> Result<Vec<Alert>> {
        let mut alerts = Vec::new();
        for resource in self.store.list_all()? {
            for reco in &resource.recommendations {
                if reco.status != RecoStatus::Active {
                    continue;
                }
                match project(&resource, reco) {
                    Ok(alert) => alerts.push(alert),
                    // A stored title that cannot be encoded is a data bug;
                    // skip the alert rather than failing the whole view.
                    Err(err) => log::warn!("unprojectable recommendation: {err}"),
                }
            }
        }
        alerts.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.id.cmp(&b.id)));
        Ok(alerts)
    }

    pub fn get_alert(&self, id: &str) -> Result<Alert> {
        let (resource_id, title) = decode_alert_id(id)?;
        let (resource, reco) = self.locate(&resource_id, &title)?;
        project(&resource, &reco)
    }

    /// Decode the id, find the owning recommendation by case-insensitive
    /// title, replace its status, and persist the whole resource.
    pub fn set_alert_status(&self, id: &str, status: RecoStatus) -> Result<Resource> {
        let (resource_id, title) = decode_alert_id(id)?;
        for kind in ResourceKind::ALL {
            if let Some(mut resource) = self.store.get(&resource_id, kind)? {
                if let Some(reco) = resource.recommendation_mut(&title) {
                    reco.status = status;
                    resource.last_activity = Some(Utc::now());
                    return Ok(self.store.upsert(resource)?);
                }
            }
        }
        Err(CloudTrimError::NotFound(format!("alert {id}")))
    }

    /// Virtual delete: the underlying recommendation is suppressed, not
    /// removed, and the suppression survives the next re-sync.
    pub fn suppress_alert(&self, id: &str) -> Result<Resource> {
        self.set_alert_status(id, RecoStatus::Suppressed)
    }

    fn locate(&self, resource_id: &str, title: &str) -> Result<(Resource, Recommendation)> {
        for kind in ResourceKind::ALL {
            if let Some(resource) = self.store.get(resource_id, kind)? {
                if let Some(reco) = resource
                    .recommendations
                    .iter()
                    .find(|r| r.title.eq_ignore_ascii_case(title))
                {
                    let reco = reco.clone();
                    return Ok((resource, reco));
                }
            }
        }
        Err(CloudTrimError::NotFound(format!(
            "no recommendation '{title}' on resource '{resource_id}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::store::MemoryStore;
    use proptest::prelude::*;

    fn resource_with(titles: &[&str]) -> Resource {
        Resource {
            resource_id: "bucket-9".into(),
            resource_type: ResourceKind::ObjectStore,
            name: "bucket-9".into(),
            provider: "AWS".into(),
            region: "us-east-1".into(),
            status: super::super::types::ResourceStatus::Running,
            utilization: 0.0,
            monthly_cost: 10.0,
            is_optimized: false,
            recommendations: titles
                .iter()
                .map(|t| {
                    Recommendation::new(
                        *t,
                        "d",
                        RecoType::Security,
                        Severity::Critical,
                        "issue",
                        Impact::High,
                        None,
                        vec![],
                    )
                })
                .collect(),
            last_checked_time: Utc::now(),
            last_activity: None,
            cooldown_seconds: 86400,
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let id = encode_alert_id("bucket-9", "Block Public Access").unwrap();
        assert_eq!(id, "bucket-9:Block~Public~Access");
        let (rid, title) = decode_alert_id(&id).unwrap();
        assert_eq!(rid, "bucket-9");
        assert_eq!(title, "Block Public Access");
    }

    #[test]
    fn encode_rejects_reserved_characters() {
        assert!(encode_alert_id("a:b", "title").is_err());
        assert!(encode_alert_id("a", "has:colon").is_err());
        assert!(encode_alert_id("a", "has~tilde").is_err());
        assert!(encode_alert_id("", "t").is_err());
    }

    #[test]
    fn decode_rejects_malformed_ids() {
        assert!(decode_alert_id("no-separator").is_err());
        assert!(decode_alert_id(":title").is_err());
        assert!(decode_alert_id("rid:").is_err());
    }

    #[test]
    fn listing_projects_only_active_recommendations() {
        let store = Arc::new(MemoryStore::new());
        let mut r = resource_with(&["Block Public Access", "Enable server-side encryption"]);
        r.recommendations[1].status = RecoStatus::Resolved;
        store.upsert(r).unwrap();

        let projector = AlertProjector::new(store);
        let alerts = projector.list_alerts().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].id, "bucket-9:Block~Public~Access");
        assert_eq!(alerts[0].affected_resources, vec!["bucket-9".to_string()]);
    }

    #[test]
    fn status_transition_persists_on_the_recommendation() {
        let store = Arc::new(MemoryStore::new());
        store.upsert(resource_with(&["Block Public Access"])).unwrap();

        let projector = AlertProjector::new(store.clone());
        // Title match is case-insensitive after decode.
        let updated = projector
            .set_alert_status("bucket-9:BLOCK~public~ACCESS", RecoStatus::Resolved)
            .unwrap();
        assert_eq!(updated.recommendations[0].status, RecoStatus::Resolved);
        assert!(updated.last_activity.is_some());

        let stored = store
            .get("bucket-9", ResourceKind::ObjectStore)
            .unwrap()
            .unwrap();
        assert_eq!(stored.recommendations[0].status, RecoStatus::Resolved);
        // The alert view no longer carries it.
        assert!(projector.list_alerts().unwrap().is_empty());
    }

    #[test]
    fn unknown_ids_surface_not_found() {
        let projector = AlertProjector::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            projector.get_alert("ghost:Nothing~Here"),
            Err(CloudTrimError::NotFound(_))
        ));
        assert!(matches!(
            projector.set_alert_status("ghost:Nothing", RecoStatus::Resolved),
            Err(CloudTrimError::NotFound(_))
        ));
        assert!(matches!(
            projector.get_alert("malformed"),
            Err(CloudTrimError::Validation(_))
        ));
    }

    #[test]
    fn suppression_is_virtual_delete() {
        let store = Arc::new(MemoryStore::new());
        store.upsert(resource_with(&["Block Public Access"])).unwrap();
        let projector = AlertProjector::new(store.clone());

        projector
            .suppress_alert("bucket-9:Block~Public~Access")
            .unwrap();
        let stored = store
            .get("bucket-9", ResourceKind::ObjectStore)
            .unwrap()
            .unwrap();
        // Still present on the resource, only logically suppressed.
        assert_eq!(stored.recommendations.len(), 1);
        assert_eq!(stored.recommendations[0].status, RecoStatus::Suppressed);
    }

    proptest! {
        /// Round-trip holds for every id/title the sanitizer can produce.
        #[test]
        fn round_trip_for_sanitized_titles(
            rid in "[A-Za-z0-9_./-]{1,24}",
            raw_title in "[A-Za-z0-9 :~-]{1,40}",
        ) {
            let title = super::super::types::sanitize_title(raw_title.trim());
            prop_assume!(!title.is_empty());
            let id = encode_alert_id(&rid, &title).unwrap();
            let (decoded_rid, decoded_title) = decode_alert_id(&id).unwrap();
            prop_assert_eq!(decoded_rid, rid);
            prop_assert_eq!(decoded_title, title);
        }
    }
}
