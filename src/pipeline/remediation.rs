//! Remediation execution: placeholder resolution and ordered step dispatch.
//!
//! Steps execute strictly in declared order; each produces one outcome.
//! Failures are data, not errors; the caller aggregates them to decide
//! whether the originating recommendation is resolved. Completed side effects
//! are never rolled back; the outcome list reports exactly which steps ran.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::types::{Resource, ResourceKind, Step};
use crate::provider::ProviderGateway;

/// What to do with the remaining sequence after a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Steps are independent by default; record the failure and keep going.
    #[default]
    ContinueOnError,
    /// Stop the sequence at the first failure.
    AbortOnFirstFailure,
}

/// Outcome of one executed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationOutcome {
    /// `"{service}.{operation}"`.
    pub operation: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RemediationOutcome {
    pub fn ok(operation: String, response: Value) -> Self {
        Self {
            operation,
            success: true,
            response: Some(response),
            error: None,
        }
    }

    pub fn failed(operation: String, error: String) -> Self {
        Self {
            operation,
            success: false,
            response: None,
            error: Some(error),
        }
    }
}

/// True iff the sequence fully succeeded (non-empty, every step ok).
pub fn all_succeeded(outcomes: &[RemediationOutcome]) -> bool {
    !outcomes.is_empty() && outcomes.iter().all(|o| o.success)
}

/// Replace every `{key}` token in `input` with its binding.
pub fn resolve_command(input: &str, bindings: &HashMap<String, String>) -> String {
    let mut out = input.to_string();
    for (key, value) in bindings {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

/// Recursively resolve placeholders through strings, arrays, and nested
/// objects.
pub fn resolve_placeholders(value: &Value, bindings: &HashMap<String, String>) -> Value {
    match value {
        Value::String(s) => Value::String(resolve_command(s, bindings)),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| resolve_placeholders(v, bindings))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_placeholders(v, bindings)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Placeholder bindings for a resource, keyed by the tokens the command
/// catalog uses.
pub fn bindings_for(resource: &Resource) -> HashMap<String, String> {
    let mut bindings = HashMap::new();
    bindings.insert("resource_id".to_string(), resource.resource_id.clone());
    bindings.insert("region".to_string(), resource.region.clone());
    match resource.resource_type {
        ResourceKind::Compute => {
            bindings.insert("instance_id".to_string(), resource.resource_id.clone());
        }
        ResourceKind::ObjectStore => {
            bindings.insert("bucket_name".to_string(), resource.resource_id.clone());
        }
        ResourceKind::Table => {
            bindings.insert("table_name".to_string(), resource.resource_id.clone());
        }
    }
    bindings
}

/// Executes remediation sequences against the provider gateway.
pub struct RemediationExecutor<P> {
    provider: Arc<P>,
    policy: FailurePolicy,
}

impl<P: ProviderGateway> RemediationExecutor<P> {
    pub fn new(provider: Arc<P>, policy: FailurePolicy) -> Self {
        Self { provider, policy }
    }

    /// Run the sequence in declared order, one outcome per executed step.
    /// Advisory steps (no provider operation) are skipped without an outcome.
    pub async fn execute(
        &self,
        steps: &[Step],
        bindings: &HashMap<String, String>,
    ) -> Vec<RemediationOutcome> {
        let mut ordered: Vec<&Step> = steps.iter().collect();
        ordered.sort_by_key(|s| s.order);

        let mut outcomes = Vec::new();
        for step in ordered {
            let Some(op) = &step.provider_operation else {
                log::debug!("skipping advisory step: {}", step.human_command);
                continue;
            };
            let operation = format!("{}.{}", op.service, op.operation);
            let params = resolve_placeholders(&op.params, bindings);

            log::info!("running {operation}");
            match self.provider.invoke(&op.service, &op.operation, &params).await {
                Ok(response) => outcomes.push(RemediationOutcome::ok(operation, response)),
                Err(err) => {
                    log::warn!("{operation} failed: {err}");
                    outcomes.push(RemediationOutcome::failed(operation, err.to_string()));
                    if self.policy == FailurePolicy::AbortOnFirstFailure {
                        break;
                    }
                }
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::ProviderOp;
    use crate::provider::{
        BucketSummary, ComputeInstance, MetricQuery, ProviderError, TableSummary,
    };
    use serde_json::json;

    /// Provider whose `invoke` fails for operations listed in `failing`.
    struct FlakyProvider {
        failing: Vec<&'static str>,
    }

    impl ProviderGateway for FlakyProvider {
        async fn describe_instances(&self) -> Result<Vec<ComputeInstance>, ProviderError> {
            Ok(vec![])
        }
        async fn list_buckets(&self) -> Result<Vec<BucketSummary>, ProviderError> {
            Ok(vec![])
        }
        async fn list_tables(&self) -> Result<Vec<TableSummary>, ProviderError> {
            Ok(vec![])
        }
        async fn get_metric(&self, _: &MetricQuery) -> Result<Option<f64>, ProviderError> {
            Ok(None)
        }
        async fn get_cost_for_tag(&self, _: &str, _: &str) -> Result<Option<f64>, ProviderError> {
            Ok(None)
        }
        async fn invoke(
            &self,
            service: &str,
            operation: &str,
            params: &Value,
        ) -> Result<Value, ProviderError> {
            if self.failing.contains(&operation) {
                Err(ProviderError::client("Boom", format!("{operation} failed")))
            } else {
                Ok(json!({"echo": params, "op": format!("{service}.{operation}")}))
            }
        }
    }

    fn step(order: u32, operation: &str) -> Step {
        Step::new(
            order,
            format!("aws ec2 {operation} --instance-ids {{instance_id}}"),
            Some(ProviderOp {
                service: "ec2".into(),
                operation: operation.into(),
                params: json!({"InstanceIds": ["{instance_id}"]}),
            }),
        )
    }

    fn bindings() -> HashMap<String, String> {
        HashMap::from([("instance_id".to_string(), "i-001".to_string())])
    }

    #[test]
    fn placeholder_resolution_recurses_through_trees() {
        let template = json!({
            "InstanceId": "{instance_id}",
            "Nested": {"Tags": [{"Key": "origin", "Value": "{instance_id}"}]},
            "Count": 3,
        });
        let resolved = resolve_placeholders(&template, &bindings());
        assert_eq!(resolved["InstanceId"], "i-001");
        assert_eq!(resolved["Nested"]["Tags"][0]["Value"], "i-001");
        assert_eq!(resolved["Count"], 3);
    }

    #[test]
    fn unknown_placeholders_are_left_intact() {
        let resolved = resolve_command("stop {instance_id} in {region}", &bindings());
        assert_eq!(resolved, "stop i-001 in {region}");
    }

    #[tokio::test]
    async fn all_steps_succeeding_aggregates_true() {
        let exec = RemediationExecutor::new(
            Arc::new(FlakyProvider { failing: vec![] }),
            FailurePolicy::ContinueOnError,
        );
        let steps = vec![step(1, "stop_instances"), step(2, "start_instances")];
        let outcomes = exec.execute(&steps, &bindings()).await;
        assert_eq!(outcomes.len(), 2);
        assert!(all_succeeded(&outcomes));
        assert_eq!(outcomes[0].operation, "ec2.stop_instances");
    }

    #[tokio::test]
    async fn failure_does_not_abort_by_default() {
        let exec = RemediationExecutor::new(
            Arc::new(FlakyProvider {
                failing: vec!["modify_instance_attribute"],
            }),
            FailurePolicy::ContinueOnError,
        );
        let steps = vec![
            step(1, "stop_instances"),
            step(2, "modify_instance_attribute"),
            step(3, "start_instances"),
        ];
        let outcomes = exec.execute(&steps, &bindings()).await;
        assert_eq!(outcomes.len(), 3);
        assert!(!all_succeeded(&outcomes));
        assert!(outcomes[1].error.as_deref().unwrap().contains("failed"));
        assert!(outcomes[2].success);
    }

    #[tokio::test]
    async fn abort_policy_stops_at_first_failure() {
        let exec = RemediationExecutor::new(
            Arc::new(FlakyProvider {
                failing: vec!["stop_instances"],
            }),
            FailurePolicy::AbortOnFirstFailure,
        );
        let steps = vec![step(1, "stop_instances"), step(2, "start_instances")];
        let outcomes = exec.execute(&steps, &bindings()).await;
        assert_eq!(outcomes.len(), 1);
        assert!(!outcomes[0].success);
    }

    #[tokio::test]
    async fn steps_run_in_declared_order_regardless_of_slice_order() {
        let exec = RemediationExecutor::new(
            Arc::new(FlakyProvider { failing: vec![] }),
            FailurePolicy::ContinueOnError,
        );
        let steps = vec![step(3, "start_instances"), step(1, "stop_instances")];
        let outcomes = exec.execute(&steps, &bindings()).await;
        assert_eq!(outcomes[0].operation, "ec2.stop_instances");
        assert_eq!(outcomes[1].operation, "ec2.start_instances");
    }

    #[test]
    fn empty_outcome_list_is_not_success() {
        assert!(!all_succeeded(&[]));
    }
}
