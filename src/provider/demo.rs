//! Deterministic demo inventory provider.
//!
//! Stands in for live provider credentials so the CLI and tests can exercise
//! the full pipeline. The inventory mirrors a small but representative fleet:
//! a busy web server, an idle batch worker, a public bucket, an un-archived
//! backup bucket, and an over-provisioned session table.

use chrono::Utc;
use serde_json::{Value, json};
use std::collections::HashMap;

use super::{
    BucketSummary, ComputeInstance, MetricQuery, ProviderError, ProviderGateway, TableSummary,
};

/// Operations the demo provider accepts through `invoke`, per service.
const SUPPORTED_OPERATIONS: &[(&str, &[&str])] = &[
    (
        "ec2",
        &[
            "stop_instances",
            "start_instances",
            "modify_instance_attribute",
            "monitor_instances",
            "revoke_security_group_ingress",
        ],
    ),
    (
        "s3",
        &[
            "put_public_access_block",
            "put_bucket_encryption",
            "put_bucket_lifecycle_configuration",
        ],
    ),
    ("dynamodb", &["update_table", "update_continuous_backups"]),
    ("iam", &["detach_user_policy"]),
    ("events", &["put_rule", "put_targets"]),
];

#[derive(Debug, Default)]
pub struct DemoProvider {
    region: String,
    utilization: HashMap<String, f64>,
    costs: HashMap<String, f64>,
}

impl DemoProvider {
    pub fn new(region: impl Into<String>) -> Self {
        let mut utilization = HashMap::new();
        utilization.insert("i-0123456789".to_string(), 15.0);
        utilization.insert("i-0fedcba987".to_string(), 4.0);
        utilization.insert("sessions".to_string(), 12.0);

        let mut costs = HashMap::new();
        costs.insert("i-0123456789".to_string(), 89.50);
        costs.insert("i-0fedcba987".to_string(), 90.0);
        costs.insert("prod-data-storage".to_string(), 31.75);
        costs.insert("backup-bucket".to_string(), 45.20);
        costs.insert("sessions".to_string(), 58.00);

        Self {
            region: region.into(),
            utilization,
            costs,
        }
    }

    fn operation_supported(service: &str, operation: &str) -> bool {
        SUPPORTED_OPERATIONS
            .iter()
            .find(|(s, _)| *s == service)
            .map(|(_, ops)| ops.contains(&operation))
            .unwrap_or(false)
    }

    fn service_known(service: &str) -> bool {
        SUPPORTED_OPERATIONS.iter().any(|(s, _)| *s == service)
    }
}

impl ProviderGateway for DemoProvider {
    async fn describe_instances(&self) -> Result<Vec<ComputeInstance>, ProviderError> {
        Ok(vec![
            ComputeInstance {
                instance_id: "i-0123456789".into(),
                name: "web-server-1".into(),
                state: "running".into(),
                instance_type: "t3.large".into(),
                region: self.region.clone(),
                launch_time: Some(Utc::now()),
            },
            ComputeInstance {
                instance_id: "i-0fedcba987".into(),
                name: "batch-worker".into(),
                state: "running".into(),
                instance_type: "t3.large".into(),
                region: self.region.clone(),
                launch_time: Some(Utc::now()),
            },
        ])
    }

    async fn list_buckets(&self) -> Result<Vec<BucketSummary>, ProviderError> {
        Ok(vec![
            BucketSummary {
                name: "prod-data-storage".into(),
                region: self.region.clone(),
                public_access_blocked: false,
                encryption_enabled: true,
                lifecycle_configured: true,
            },
            BucketSummary {
                name: "backup-bucket".into(),
                region: self.region.clone(),
                public_access_blocked: true,
                encryption_enabled: false,
                lifecycle_configured: false,
            },
        ])
    }

    async fn list_tables(&self) -> Result<Vec<TableSummary>, ProviderError> {
        Ok(vec![TableSummary {
            name: "sessions".into(),
            region: self.region.clone(),
            billing_mode: "PROVISIONED".into(),
            provisioned_read_units: Some(100),
            provisioned_write_units: Some(100),
            point_in_time_recovery: false,
        }])
    }

    async fn get_metric(&self, query: &MetricQuery) -> Result<Option<f64>, ProviderError> {
        let target = query
            .dimensions
            .first()
            .map(|(_, v)| v.as_str())
            .unwrap_or_default();
        Ok(self.utilization.get(target).copied())
    }

    async fn get_cost_for_tag(
        &self,
        _key: &str,
        value: &str,
    ) -> Result<Option<f64>, ProviderError> {
        Ok(self.costs.get(value).copied())
    }

    async fn invoke(
        &self,
        service: &str,
        operation: &str,
        params: &Value,
    ) -> Result<Value, ProviderError> {
        if !Self::service_known(service) {
            return Err(ProviderError::client(
                "UnsupportedService",
                format!("unsupported service '{service}'"),
            ));
        }
        if !Self::operation_supported(service, operation) {
            return Err(ProviderError::client(
                "UnknownOperation",
                format!("invalid operation '{operation}' for service '{service}'"),
            ));
        }
        log::debug!("demo invoke {service}.{operation}({params})");
        Ok(json!({
            "service": service,
            "operation": operation,
            "params": params,
            "status": "ok",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invoke_rejects_unknown_service_and_operation() {
        let p = DemoProvider::new("us-east-1");
        let err = p.invoke("lambda", "invoke", &json!({})).await.unwrap_err();
        assert!(matches!(err, ProviderError::Client { .. }));
        let err = p
            .invoke("ec2", "terminate_instances", &json!({}))
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn metric_lookup_matches_dimension_value() {
        let p = DemoProvider::new("us-east-1");
        let util = p
            .get_metric(&MetricQuery::cpu_utilization("i-0fedcba987"))
            .await
            .unwrap();
        assert_eq!(util, Some(4.0));
        let miss = p
            .get_metric(&MetricQuery::cpu_utilization("i-unknown"))
            .await
            .unwrap();
        assert_eq!(miss, None);
    }
}
