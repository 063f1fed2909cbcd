//! Resource persistence with idempotent upsert and cooldown tracking.
//!
//! One record per `(resource_id, resource_type)`. `upsert` replaces the full
//! record (no merging) after normalizing numeric fields to a single canonical
//! representation, so repeated upserts of the same record are idempotent.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::types::{Resource, ResourceKey, ResourceKind};

/// Default cooldown before a resource's live data is re-fetched.
pub const DEFAULT_COOLDOWN_SECONDS: u64 = 86_400;

/// Errors raised by the persistence layer. Callers must not assume partial
/// writes succeeded.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("failed to read state file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("failed to write state file {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// Persistence contract for resource records.
pub trait ResourceStore: Send + Sync {
    /// Replace the record for the resource's key, returning the stored copy.
    fn upsert(&self, resource: Resource) -> Result<Resource, StorageError>;

    /// Fetch a record by identity.
    fn get(&self, resource_id: &str, kind: ResourceKind) -> Result<Option<Resource>, StorageError>;

    /// All records of one kind, in insertion-independent stable order
    /// (sorted by resource id).
    fn list(&self, kind: ResourceKind) -> Result<Vec<Resource>, StorageError>;

    /// All records across kinds, sorted by (kind, resource id).
    fn list_all(&self) -> Result<Vec<Resource>, StorageError>;
}

/// True iff the record is still within its cooldown window at `now`.
pub fn is_in_cooldown_at(resource: &Resource, now: DateTime<Utc>) -> bool {
    let window = Duration::seconds(resource.cooldown_seconds as i64);
    now < resource.last_checked_time + window
}

/// True iff the record is still within its cooldown window.
pub fn is_in_cooldown(resource: &Resource) -> bool {
    is_in_cooldown_at(resource, Utc::now())
}

/// Round a currency amount to whole cents.
fn round_cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Collapse numeric representations to one canonical form and enforce the
/// per-resource title-uniqueness invariant before persisting.
pub fn normalize(resource: &mut Resource) {
    resource.utilization = resource.utilization.clamp(0.0, 100.0);
    resource.monthly_cost = round_cents(resource.monthly_cost.max(0.0));

    let mut seen: Vec<String> = Vec::new();
    resource.recommendations.retain(|reco| {
        let key = reco.title.to_lowercase();
        if seen.contains(&key) {
            log::warn!(
                "dropping duplicate recommendation title '{}' on {}",
                reco.title,
                resource.resource_id
            );
            false
        } else {
            seen.push(key);
            true
        }
    });
    for reco in &mut resource.recommendations {
        if let Some(s) = reco.saving {
            reco.saving = Some(round_cents(s.max(0.0)));
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Concurrent in-memory store. The backing map serializes writers per key;
/// callers that need read→fetch→write atomicity hold the engine's per-key
/// lock around the whole unit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<ResourceKey, Resource>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResourceStore for MemoryStore {
    fn upsert(&self, mut resource: Resource) -> Result<Resource, StorageError> {
        normalize(&mut resource);
        self.records.insert(resource.key(), resource.clone());
        Ok(resource)
    }

    fn get(&self, resource_id: &str, kind: ResourceKind) -> Result<Option<Resource>, StorageError> {
        let key = ResourceKey::new(resource_id, kind);
        Ok(self.records.get(&key).map(|r| r.clone()))
    }

    fn list(&self, kind: ResourceKind) -> Result<Vec<Resource>, StorageError> {
        let mut out: Vec<Resource> = self
            .records
            .iter()
            .filter(|e| e.key().kind == kind)
            .map(|e| e.value().clone())
            .collect();
        out.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));
        Ok(out)
    }

    fn list_all(&self) -> Result<Vec<Resource>, StorageError> {
        let mut out: Vec<Resource> = self.records.iter().map(|e| e.value().clone()).collect();
        out.sort_by(|a, b| {
            (a.resource_type.as_str(), &a.resource_id).cmp(&(b.resource_type.as_str(), &b.resource_id))
        });
        Ok(out)
    }
}

// ============================================================================
// File-backed store
// ============================================================================

/// JSON-file-backed store so cooldown state survives CLI invocations.
/// The whole map is rewritten on each upsert; adequate for the record counts
/// this tool tracks.
pub struct JsonFileStore {
    path: PathBuf,
    records: Mutex<HashMap<String, Resource>>,
}

impl JsonFileStore {
    /// Open (or create) a store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let records = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| StorageError::Read {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            serde_json::from_str(&content).map_err(|e| StorageError::Read {
                path: path.clone(),
                reason: e.to_string(),
            })?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    fn map_key(resource_id: &str, kind: ResourceKind) -> String {
        format!("{}/{}", kind.as_str(), resource_id)
    }

    fn flush(&self, records: &HashMap<String, Resource>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::Write {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        }
        let content = serde_json::to_string_pretty(records).map_err(|e| StorageError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&self.path, content).map_err(|e| StorageError::Write {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

impl ResourceStore for JsonFileStore {
    fn upsert(&self, mut resource: Resource) -> Result<Resource, StorageError> {
        normalize(&mut resource);
        let mut records = self.records.lock();
        records.insert(
            Self::map_key(&resource.resource_id, resource.resource_type),
            resource.clone(),
        );
        self.flush(&records)?;
        Ok(resource)
    }

    fn get(&self, resource_id: &str, kind: ResourceKind) -> Result<Option<Resource>, StorageError> {
        let records = self.records.lock();
        Ok(records.get(&Self::map_key(resource_id, kind)).cloned())
    }

    fn list(&self, kind: ResourceKind) -> Result<Vec<Resource>, StorageError> {
        let records = self.records.lock();
        let mut out: Vec<Resource> = records
            .values()
            .filter(|r| r.resource_type == kind)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));
        Ok(out)
    }

    fn list_all(&self) -> Result<Vec<Resource>, StorageError> {
        let records = self.records.lock();
        let mut out: Vec<Resource> = records.values().cloned().collect();
        out.sort_by(|a, b| {
            (a.resource_type.as_str(), &a.resource_id).cmp(&(b.resource_type.as_str(), &b.resource_id))
        });
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{Impact, RecoType, Recommendation, ResourceStatus, Severity};

    fn sample(resource_id: &str) -> Resource {
        Resource {
            resource_id: resource_id.into(),
            resource_type: ResourceKind::Compute,
            name: "web-server-1".into(),
            provider: "AWS".into(),
            region: "us-east-1".into(),
            status: ResourceStatus::Running,
            utilization: 15.0,
            monthly_cost: 89.505,
            is_optimized: false,
            recommendations: vec![],
            last_checked_time: Utc::now(),
            last_activity: None,
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
        }
    }

    #[test]
    fn upsert_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.upsert(sample("i-001")).unwrap();
        let second = store.upsert(first.clone()).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.list(ResourceKind::Compute).unwrap().len(), 1);
    }

    #[test]
    fn upsert_normalizes_numbers() {
        let store = MemoryStore::new();
        let mut r = sample("i-002");
        r.monthly_cost = 12.3456;
        r.utilization = 140.0;
        let stored = store.upsert(r).unwrap();
        assert_eq!(stored.monthly_cost, 12.35);
        assert_eq!(stored.utilization, 100.0);
    }

    #[test]
    fn upsert_drops_duplicate_titles_case_insensitively() {
        let store = MemoryStore::new();
        let mut r = sample("i-003");
        let reco = |title: &str| {
            Recommendation::new(
                title,
                "d",
                RecoType::Cost,
                Severity::Warning,
                "i",
                Impact::Low,
                None,
                vec![],
            )
        };
        r.recommendations = vec![reco("Right-size"), reco("right-SIZE"), reco("Other")];
        let stored = store.upsert(r).unwrap();
        assert_eq!(stored.recommendations.len(), 2);
        assert_eq!(stored.recommendations[0].title, "Right-size");
    }

    #[test]
    fn cooldown_window_boundaries() {
        let mut r = sample("i-004");
        r.cooldown_seconds = 3600;
        let now = r.last_checked_time;
        assert!(is_in_cooldown_at(&r, now + Duration::seconds(3599)));
        assert!(!is_in_cooldown_at(&r, now + Duration::seconds(3600)));
    }

    #[test]
    fn get_miss_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get("absent", ResourceKind::Table).unwrap().is_none());
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.upsert(sample("i-005")).unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        let got = reopened.get("i-005", ResourceKind::Compute).unwrap();
        assert!(got.is_some());
        assert_eq!(got.unwrap().name, "web-server-1");
    }
}
