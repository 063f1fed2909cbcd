//! Recommendation engine: cache-first listing, per-key single-flight
//! refresh, strategy-based derivation, and the optimize pass.
//!
//! Cache policy is deliberate: first sight wins until the cooldown elapses.
//! A stored record inside its cooldown window is returned verbatim: the
//! provider is not re-queried for that resource, including its
//! `is_optimized` flag and existing recommendations.

use chrono::Utc;
use dashmap::DashMap;
use futures_util::future::try_join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;

use super::commands;
use super::remediation::{self, FailurePolicy, RemediationExecutor, bindings_for};
use super::rules::{self, RuleContext};
use super::store::{self, DEFAULT_COOLDOWN_SECONDS, ResourceStore};
use super::types::{
    DerivationStrategy, Impact, RecoType, Recommendation, Resource, ResourceBatch, ResourceKey,
    ResourceKind, ResourceStatus, Severity,
};
use crate::bedrock::{ModelGateway, ModelReco, ModelRecommender, RecoAction, ResourceSnapshot};
use crate::error::{CloudTrimError, Result};
use crate::provider::{
    BucketSummary, ComputeInstance, MetricQuery, ProviderError, ProviderGateway, TableSummary,
};

/// Derivation strategy per resource kind.
#[derive(Debug, Clone, Copy)]
pub struct StrategyMap {
    pub compute: DerivationStrategy,
    pub object_store: DerivationStrategy,
    pub table: DerivationStrategy,
}

impl Default for StrategyMap {
    fn default() -> Self {
        Self {
            compute: DerivationStrategy::Model,
            object_store: DerivationStrategy::RuleTable,
            table: DerivationStrategy::RuleTable,
        }
    }
}

impl StrategyMap {
    /// Every kind derives from its static rule table.
    pub fn rules_only() -> Self {
        Self {
            compute: DerivationStrategy::RuleTable,
            object_store: DerivationStrategy::RuleTable,
            table: DerivationStrategy::RuleTable,
        }
    }

    pub fn for_kind(&self, kind: ResourceKind) -> DerivationStrategy {
        match kind {
            ResourceKind::Compute => self.compute,
            ResourceKind::ObjectStore => self.object_store,
            ResourceKind::Table => self.table,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cooldown_seconds: u64,
    pub provider_timeout: Duration,
    pub failure_policy: FailurePolicy,
    pub strategies: StrategyMap,
    /// Provider label stamped on records ("AWS").
    pub provider_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
            provider_timeout: Duration::from_secs(30),
            failure_policy: FailurePolicy::default(),
            strategies: StrategyMap::default(),
            provider_name: "AWS".into(),
        }
    }
}

/// Orchestrates provider, store, rules, model, and executor.
pub struct RecommendationEngine<S, P, M> {
    store: Arc<S>,
    provider: Arc<P>,
    recommender: Arc<ModelRecommender<M>>,
    executor: RemediationExecutor<P>,
    config: EngineConfig,
    /// Per-key locks serializing read → fetch → persist for one resource.
    inflight: DashMap<ResourceKey, Arc<AsyncMutex<()>>>,
}

impl<S, P, M> RecommendationEngine<S, P, M>
where
    S: ResourceStore,
    P: ProviderGateway,
    M: ModelGateway,
{
    pub fn new(
        store: Arc<S>,
        provider: Arc<P>,
        recommender: Arc<ModelRecommender<M>>,
        config: EngineConfig,
    ) -> Self {
        let executor = RemediationExecutor::new(provider.clone(), config.failure_policy);
        Self {
            store,
            provider,
            recommender,
            executor,
            config,
            inflight: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn key_lock(&self, key: &ResourceKey) -> Arc<AsyncMutex<()>> {
        self.inflight.entry(key.clone()).or_default().value().clone()
    }

    async fn timed<T>(
        &self,
        call: impl Future<Output = std::result::Result<T, ProviderError>>,
    ) -> std::result::Result<T, ProviderError> {
        match tokio::time::timeout(self.config.provider_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.config.provider_timeout.as_secs())),
        }
    }

    /// List one kind. Per-resource refreshes run concurrently; refreshes of
    /// the same key are serialized by the per-key lock.
    pub async fn list_resources(&self, kind: ResourceKind) -> Result<ResourceBatch> {
        let resources = match kind {
            ResourceKind::Compute => {
                let instances = self.timed(self.provider.describe_instances()).await?;
                try_join_all(instances.into_iter().map(|i| self.refresh_compute(i))).await?
            }
            ResourceKind::ObjectStore => {
                let buckets = self.timed(self.provider.list_buckets()).await?;
                try_join_all(buckets.into_iter().map(|b| self.refresh_bucket(b))).await?
            }
            ResourceKind::Table => {
                let tables = self.timed(self.provider.list_tables()).await?;
                try_join_all(tables.into_iter().map(|t| self.refresh_table(t))).await?
            }
        };
        Ok(ResourceBatch::from_resources(resources))
    }

    /// Fetch a stored record without touching the provider.
    pub fn get_resource(&self, resource_id: &str, kind: ResourceKind) -> Result<Resource> {
        self.store
            .get(resource_id, kind)?
            .ok_or_else(|| CloudTrimError::NotFound(format!("{kind}/{resource_id}")))
    }

    async fn refresh_compute(&self, instance: ComputeInstance) -> Result<Resource> {
        let key = ResourceKey::new(instance.instance_id.clone(), ResourceKind::Compute);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        let existing = self.store.get(&instance.instance_id, ResourceKind::Compute)?;
        if let Some(cached) = &existing {
            if store::is_in_cooldown(cached) {
                log::debug!("{key} in cooldown; serving cached record");
                return Ok(cached.clone());
            }
        }

        let utilization = self
            .timed(
                self.provider
                    .get_metric(&MetricQuery::cpu_utilization(&instance.instance_id)),
            )
            .await?
            .unwrap_or(0.0);
        let monthly_cost = self
            .timed(
                self.provider
                    .get_cost_for_tag("resource-id", &instance.instance_id),
            )
            .await?
            .unwrap_or(0.0);
        let status = ResourceStatus::from_provider_state(&instance.state);

        let recommendations = match self.config.strategies.for_kind(ResourceKind::Compute) {
            DerivationStrategy::RuleTable => rules::derive_recommendations(&RuleContext {
                resource_id: &instance.instance_id,
                kind: ResourceKind::Compute,
                status,
                utilization,
                monthly_cost,
                region: &instance.region,
                bucket: None,
                table: None,
            }),
            DerivationStrategy::Model => {
                let snapshot = ResourceSnapshot {
                    id: instance.instance_id.clone(),
                    kind: ResourceKind::Compute.as_str().into(),
                    status: status.as_str().into(),
                    utilization_pct: utilization,
                    monthly_cost_usd: monthly_cost,
                    region: instance.region.clone(),
                    instance_type: Some(instance.instance_type.clone()),
                };
                let reco = self.recommender.recommend(&snapshot).await;
                model_derived_recommendations(&reco, ResourceKind::Compute)
            }
        };

        self.persist_refreshed(Resource {
            resource_id: instance.instance_id.clone(),
            resource_type: ResourceKind::Compute,
            name: instance.name.clone(),
            provider: self.config.provider_name.clone(),
            region: instance.region.clone(),
            status,
            utilization,
            monthly_cost,
            is_optimized: false,
            recommendations,
            last_checked_time: Utc::now(),
            last_activity: None,
            cooldown_seconds: self.config.cooldown_seconds,
        }, existing)
    }

    async fn refresh_bucket(&self, bucket: BucketSummary) -> Result<Resource> {
        let key = ResourceKey::new(bucket.name.clone(), ResourceKind::ObjectStore);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        let existing = self.store.get(&bucket.name, ResourceKind::ObjectStore)?;
        if let Some(cached) = &existing {
            if store::is_in_cooldown(cached) {
                log::debug!("{key} in cooldown; serving cached record");
                return Ok(cached.clone());
            }
        }

        let monthly_cost = self
            .timed(self.provider.get_cost_for_tag("resource-id", &bucket.name))
            .await?
            .unwrap_or(0.0);

        // Bucket recommendations come from the rule table regardless of the
        // configured strategy; the model schema has no bucket-fact inputs.
        let recommendations = rules::derive_recommendations(&RuleContext {
            resource_id: &bucket.name,
            kind: ResourceKind::ObjectStore,
            status: ResourceStatus::Running,
            utilization: 0.0,
            monthly_cost,
            region: &bucket.region,
            bucket: Some(&bucket),
            table: None,
        });

        self.persist_refreshed(Resource {
            resource_id: bucket.name.clone(),
            resource_type: ResourceKind::ObjectStore,
            name: bucket.name.clone(),
            provider: self.config.provider_name.clone(),
            region: bucket.region.clone(),
            status: ResourceStatus::Running,
            utilization: 0.0,
            monthly_cost,
            is_optimized: false,
            recommendations,
            last_checked_time: Utc::now(),
            last_activity: None,
            cooldown_seconds: self.config.cooldown_seconds,
        }, existing)
    }

    async fn refresh_table(&self, table: TableSummary) -> Result<Resource> {
        let key = ResourceKey::new(table.name.clone(), ResourceKind::Table);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        let existing = self.store.get(&table.name, ResourceKind::Table)?;
        if let Some(cached) = &existing {
            if store::is_in_cooldown(cached) {
                log::debug!("{key} in cooldown; serving cached record");
                return Ok(cached.clone());
            }
        }

        let utilization = self
            .timed(self.provider.get_metric(&MetricQuery {
                namespace: "AWS/DynamoDB".into(),
                name: "ConsumedReadCapacityUnits".into(),
                dimensions: vec![("TableName".into(), table.name.clone())],
                period_seconds: 300,
                stat: "Average".into(),
            }))
            .await?
            .unwrap_or(0.0);
        let monthly_cost = self
            .timed(self.provider.get_cost_for_tag("resource-id", &table.name))
            .await?
            .unwrap_or(0.0);

        let recommendations = rules::derive_recommendations(&RuleContext {
            resource_id: &table.name,
            kind: ResourceKind::Table,
            status: ResourceStatus::Running,
            utilization,
            monthly_cost,
            region: &table.region,
            bucket: None,
            table: Some(&table),
        });

        self.persist_refreshed(Resource {
            resource_id: table.name.clone(),
            resource_type: ResourceKind::Table,
            name: table.name.clone(),
            provider: self.config.provider_name.clone(),
            region: table.region.clone(),
            status: ResourceStatus::Running,
            utilization,
            monthly_cost,
            is_optimized: false,
            recommendations,
            last_checked_time: Utc::now(),
            last_activity: None,
            cooldown_seconds: self.config.cooldown_seconds,
        }, existing)
    }

    /// Carry recommendation statuses across a re-sync, then persist.
    /// A recommendation the operator resolved or suppressed keeps that state
    /// when re-derivation produces the same title again.
    fn persist_refreshed(
        &self,
        mut fresh: Resource,
        previous: Option<Resource>,
    ) -> Result<Resource> {
        if let Some(prev) = previous {
            fresh.last_activity = prev.last_activity;
            for reco in &mut fresh.recommendations {
                if let Some(old) = prev
                    .recommendations
                    .iter()
                    .find(|r| r.title.eq_ignore_ascii_case(&reco.title))
                {
                    if old.status != super::types::RecoStatus::Active {
                        reco.status = old.status;
                    }
                }
            }
        }
        Ok(self.store.upsert(fresh)?)
    }

    /// Run every executable recommendation's sequence. A recommendation is
    /// marked resolved iff all of its steps succeeded. The resource status
    /// becomes `optimized` regardless; it records that an optimization pass
    /// was attempted, not that every issue is fixed; callers inspect the
    /// per-recommendation statuses for the real outcome.
    pub async fn optimize(&self, resource_id: &str, kind: ResourceKind) -> Result<Resource> {
        let key = ResourceKey::new(resource_id, kind);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        let mut resource = self
            .store
            .get(resource_id, kind)?
            .ok_or_else(|| CloudTrimError::NotFound(format!("{kind}/{resource_id}")))?;

        let bindings = bindings_for(&resource);
        for reco in &mut resource.recommendations {
            if reco.status != super::types::RecoStatus::Active || !reco.is_executable() {
                continue;
            }
            let outcomes = self.executor.execute(&reco.solution_steps, &bindings).await;
            let succeeded = remediation::all_succeeded(&outcomes);
            log::info!(
                "remediation '{}' on {key}: {}/{} steps succeeded",
                reco.title,
                outcomes.iter().filter(|o| o.success).count(),
                outcomes.len(),
            );
            if succeeded {
                reco.status = super::types::RecoStatus::Resolved;
            }
        }

        resource.status = ResourceStatus::Optimized;
        resource.is_optimized = true;
        resource.last_activity = Some(Utc::now());
        Ok(self.store.upsert(resource)?)
    }
}

/// Project a model recommendation into the resource's recommendation list.
/// The conservative fallback (confidence ≤ 0.2) is kept as an advisory
/// monitor-style entry so the pipeline always yields some recommendation.
pub fn model_derived_recommendations(reco: &ModelReco, kind: ResourceKind) -> Vec<Recommendation> {
    let title = match reco.action {
        RecoAction::Resize => "Right-size",
        RecoAction::Stop => "Stop instance",
        RecoAction::Schedule => "Schedule off-hours stop",
        RecoAction::Monitor => "Monitor usage",
    };
    let severity = if reco.confidence >= 0.8 {
        Severity::High
    } else if reco.confidence >= 0.4 {
        Severity::Warning
    } else {
        Severity::Info
    };
    let impact = match reco.estimated_savings_usd {
        Some(s) if s >= 100.0 => Impact::High,
        Some(s) if s >= 25.0 => Impact::Medium,
        _ => Impact::Low,
    };
    let description = match &reco.target_size {
        Some(size) => format!(
            "Proposed {} to {size} ({}, confidence {:.0}%)",
            reco.action,
            reco.reason,
            reco.confidence * 100.0
        ),
        None => format!(
            "Proposed {} ({}, confidence {:.0}%)",
            reco.action,
            reco.reason,
            reco.confidence * 100.0
        ),
    };

    vec![Recommendation::new(
        title,
        description,
        RecoType::Cost,
        severity,
        reco.reason.clone(),
        impact,
        reco.estimated_savings_usd,
        commands::steps_for_model_reco(reco, kind),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bedrock::{ModelError, ModelOptions, RetryPolicy};
    use crate::pipeline::store::MemoryStore;
    use crate::pipeline::types::RecoStatus;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider with one under-utilized instance and call counters.
    #[derive(Default)]
    struct CountingProvider {
        metric_calls: AtomicUsize,
        invoke_calls: AtomicUsize,
        failing_operations: Vec<&'static str>,
    }

    impl ProviderGateway for CountingProvider {
        async fn describe_instances(&self) -> std::result::Result<Vec<ComputeInstance>, ProviderError> {
            Ok(vec![ComputeInstance {
                instance_id: "i-001".into(),
                name: "web-server-1".into(),
                state: "running".into(),
                instance_type: "t3.large".into(),
                region: "us-east-1".into(),
                launch_time: None,
            }])
        }
        async fn list_buckets(&self) -> std::result::Result<Vec<BucketSummary>, ProviderError> {
            Ok(vec![])
        }
        async fn list_tables(&self) -> std::result::Result<Vec<TableSummary>, ProviderError> {
            Ok(vec![])
        }
        async fn get_metric(
            &self,
            _: &MetricQuery,
        ) -> std::result::Result<Option<f64>, ProviderError> {
            self.metric_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(4.0))
        }
        async fn get_cost_for_tag(
            &self,
            _: &str,
            _: &str,
        ) -> std::result::Result<Option<f64>, ProviderError> {
            Ok(Some(90.0))
        }
        async fn invoke(
            &self,
            service: &str,
            operation: &str,
            _: &Value,
        ) -> std::result::Result<Value, ProviderError> {
            self.invoke_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing_operations.contains(&operation) {
                Err(ProviderError::client("Boom", format!("{operation} failed")))
            } else {
                Ok(json!({"op": format!("{service}.{operation}")}))
            }
        }
    }

    /// Gateway returning one scripted response forever.
    struct FixedGateway(std::result::Result<String, ()>);

    impl ModelGateway for FixedGateway {
        async fn invoke_raw(
            &self,
            _: &str,
            _: &str,
        ) -> std::result::Result<String, ModelError> {
            match &self.0 {
                Ok(s) => Ok(s.clone()),
                Err(()) => Err(ModelError::Client {
                    code: "ValidationException".into(),
                    message: "scripted failure".into(),
                }),
            }
        }
    }

    fn engine_with(
        provider: CountingProvider,
        strategies: StrategyMap,
        gateway: FixedGateway,
    ) -> RecommendationEngine<MemoryStore, CountingProvider, FixedGateway> {
        let recommender = Arc::new(ModelRecommender::new(
            gateway,
            ModelOptions::default(),
            RetryPolicy::immediate(1),
        ));
        RecommendationEngine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(provider),
            recommender,
            EngineConfig {
                strategies,
                ..EngineConfig::default()
            },
        )
    }

    fn rules_engine(
        provider: CountingProvider,
    ) -> RecommendationEngine<MemoryStore, CountingProvider, FixedGateway> {
        engine_with(provider, StrategyMap::rules_only(), FixedGateway(Err(())))
    }

    #[tokio::test]
    async fn first_sight_attaches_rule_recommendation() {
        let engine = rules_engine(CountingProvider::default());
        let batch = engine.list_resources(ResourceKind::Compute).await.unwrap();

        assert_eq!(batch.resources.len(), 1);
        let r = &batch.resources[0];
        assert_eq!(r.resource_id, "i-001");
        assert_eq!(r.utilization, 4.0);
        assert_eq!(r.monthly_cost, 90.0);
        assert!(!r.is_optimized);
        assert_eq!(r.recommendations.len(), 1);
        assert_eq!(r.recommendations[0].title, "Right-size");
        assert_eq!(r.recommendations[0].status, RecoStatus::Active);
        assert_eq!(batch.idle, 1);
    }

    #[tokio::test]
    async fn cooldown_serves_cached_record_without_provider_calls() {
        let engine = rules_engine(CountingProvider::default());
        let first = engine.list_resources(ResourceKind::Compute).await.unwrap();
        assert_eq!(engine.provider.metric_calls.load(Ordering::SeqCst), 1);

        let second = engine.list_resources(ResourceKind::Compute).await.unwrap();
        assert_eq!(engine.provider.metric_calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            serde_json::to_value(&first.resources[0]).unwrap(),
            serde_json::to_value(&second.resources[0]).unwrap(),
        );
    }

    #[tokio::test]
    async fn optimize_resolves_when_all_steps_succeed() {
        let engine = rules_engine(CountingProvider::default());
        engine.list_resources(ResourceKind::Compute).await.unwrap();

        let optimized = engine.optimize("i-001", ResourceKind::Compute).await.unwrap();
        assert_eq!(optimized.status, ResourceStatus::Optimized);
        assert!(optimized.is_optimized);
        assert_eq!(optimized.recommendations[0].status, RecoStatus::Resolved);
        // Right-size sequence is stop + modify + start.
        assert_eq!(engine.provider.invoke_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn optimize_keeps_recommendation_active_on_partial_failure() {
        let engine = rules_engine(CountingProvider {
            failing_operations: vec!["modify_instance_attribute"],
            ..CountingProvider::default()
        });
        engine.list_resources(ResourceKind::Compute).await.unwrap();

        let optimized = engine.optimize("i-001", ResourceKind::Compute).await.unwrap();
        // The pass was attempted, so the resource is marked optimized...
        assert_eq!(optimized.status, ResourceStatus::Optimized);
        // ...but the recommendation itself stays active.
        assert_eq!(optimized.recommendations[0].status, RecoStatus::Active);
    }

    #[tokio::test]
    async fn optimize_unknown_resource_is_not_found() {
        let engine = rules_engine(CountingProvider::default());
        let err = engine.optimize("i-missing", ResourceKind::Compute).await;
        assert!(matches!(err, Err(CloudTrimError::NotFound(_))));
    }

    #[tokio::test]
    async fn model_strategy_attaches_model_derived_recommendation() {
        let engine = engine_with(
            CountingProvider::default(),
            StrategyMap::default(),
            FixedGateway(Ok(
                r#"{"action":"stop","reason":"idle for a week","estimated_savings_usd":90.0,"confidence":0.9}"#.into(),
            )),
        );
        let batch = engine.list_resources(ResourceKind::Compute).await.unwrap();
        let recos = &batch.resources[0].recommendations;
        assert_eq!(recos.len(), 1);
        assert_eq!(recos[0].title, "Stop instance");
        assert_eq!(recos[0].severity, Severity::High);
        assert_eq!(recos[0].solution_steps.len(), 1);
    }

    #[tokio::test]
    async fn model_failure_still_yields_a_recommendation() {
        let engine = engine_with(
            CountingProvider::default(),
            StrategyMap::default(),
            FixedGateway(Err(())),
        );
        let batch = engine.list_resources(ResourceKind::Compute).await.unwrap();
        let recos = &batch.resources[0].recommendations;
        assert_eq!(recos.len(), 1);
        // Fallback is a low-confidence resize with no target size: advisory.
        assert_eq!(recos[0].title, "Right-size");
        assert_eq!(recos[0].severity, Severity::Info);
        assert!(recos[0].solution_steps.is_empty());
    }
}
