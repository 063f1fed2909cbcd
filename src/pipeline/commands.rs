//! Catalog of remediation step sequences.
//!
//! Each builder returns an ordered sequence with both a human-readable CLI
//! command template and the provider operation template actually dispatched.
//! Placeholders like `{instance_id}` stay unresolved until execution time,
//! when the executor binds them to a concrete resource.

use serde_json::json;

use super::types::{ProviderOp, ResourceKind, Step};
use crate::bedrock::{ModelReco, RecoAction};

fn op(service: &str, operation: &str, params: serde_json::Value) -> Option<ProviderOp> {
    Some(ProviderOp {
        service: service.into(),
        operation: operation.into(),
        params,
    })
}

/// Stop → modify type → start. Later steps depend on the earlier ones.
pub fn resize_instance_steps(target_size: &str) -> Vec<Step> {
    vec![
        Step::new(
            1,
            "aws ec2 stop-instances --instance-ids {instance_id}",
            op(
                "ec2",
                "stop_instances",
                json!({"InstanceIds": ["{instance_id}"]}),
            ),
        ),
        Step::new(
            2,
            format!(
                "aws ec2 modify-instance-attribute --instance-id {{instance_id}} --instance-type \"Value={target_size}\""
            ),
            op(
                "ec2",
                "modify_instance_attribute",
                json!({"InstanceId": "{instance_id}", "InstanceType": {"Value": target_size}}),
            ),
        ),
        Step::new(
            3,
            "aws ec2 start-instances --instance-ids {instance_id}",
            op(
                "ec2",
                "start_instances",
                json!({"InstanceIds": ["{instance_id}"]}),
            ),
        ),
    ]
}

pub fn stop_instance_steps() -> Vec<Step> {
    vec![Step::new(
        1,
        "aws ec2 stop-instances --instance-ids {instance_id}",
        op(
            "ec2",
            "stop_instances",
            json!({"InstanceIds": ["{instance_id}"]}),
        ),
    )]
}

/// Scheduled off-hours stop via an EventBridge rule.
pub fn schedule_stop_steps() -> Vec<Step> {
    vec![
        Step::new(
            1,
            "aws events put-rule --schedule-expression 'cron(0 20 * * ? *)' --name stop-{instance_id}-nightly",
            op(
                "events",
                "put_rule",
                json!({
                    "Name": "stop-{instance_id}-nightly",
                    "ScheduleExpression": "cron(0 20 * * ? *)",
                }),
            ),
        ),
        Step::new(
            2,
            "aws events put-targets --rule stop-{instance_id}-nightly --targets Id=1,Arn={stop_lambda_arn}",
            op(
                "events",
                "put_targets",
                json!({
                    "Rule": "stop-{instance_id}-nightly",
                    "Targets": [{"Id": "1", "Arn": "{stop_lambda_arn}"}],
                }),
            ),
        ),
    ]
}

pub fn enable_monitoring_steps() -> Vec<Step> {
    vec![Step::new(
        1,
        "aws ec2 monitor-instances --instance-ids {instance_id}",
        op(
            "ec2",
            "monitor_instances",
            json!({"InstanceIds": ["{instance_id}"]}),
        ),
    )]
}

pub fn block_public_access_steps() -> Vec<Step> {
    vec![Step::new(
        1,
        "aws s3api put-public-access-block --bucket {bucket_name} --public-access-block-configuration BlockPublicAcls=true,IgnorePublicAcls=true,BlockPublicPolicy=true,RestrictPublicBuckets=true",
        op(
            "s3",
            "put_public_access_block",
            json!({
                "Bucket": "{bucket_name}",
                "PublicAccessBlockConfiguration": {
                    "BlockPublicAcls": true,
                    "IgnorePublicAcls": true,
                    "BlockPublicPolicy": true,
                    "RestrictPublicBuckets": true,
                },
            }),
        ),
    )]
}

pub fn enable_bucket_encryption_steps() -> Vec<Step> {
    vec![Step::new(
        1,
        "aws s3api put-bucket-encryption --bucket {bucket_name} --server-side-encryption-configuration '{\"Rules\":[{\"ApplyServerSideEncryptionByDefault\":{\"SSEAlgorithm\":\"AES256\"}}]}'",
        op(
            "s3",
            "put_bucket_encryption",
            json!({
                "Bucket": "{bucket_name}",
                "ServerSideEncryptionConfiguration": {
                    "Rules": [{"ApplyServerSideEncryptionByDefault": {"SSEAlgorithm": "AES256"}}],
                },
            }),
        ),
    )]
}

/// Transition objects older than 90 days to cold storage.
pub fn archive_lifecycle_steps() -> Vec<Step> {
    vec![Step::new(
        1,
        "aws s3api put-bucket-lifecycle-configuration --bucket {bucket_name} --lifecycle-configuration file://archive-policy.json",
        op(
            "s3",
            "put_bucket_lifecycle_configuration",
            json!({
                "Bucket": "{bucket_name}",
                "LifecycleConfiguration": {
                    "Rules": [{
                        "ID": "archive-old-objects",
                        "Status": "Enabled",
                        "Filter": {"Prefix": ""},
                        "Transitions": [{"Days": 90, "StorageClass": "GLACIER"}],
                    }],
                },
            }),
        ),
    )]
}

pub fn reduce_throughput_steps(read_units: u64, write_units: u64) -> Vec<Step> {
    vec![Step::new(
        1,
        format!(
            "aws dynamodb update-table --table-name {{table_name}} --provisioned-throughput ReadCapacityUnits={read_units},WriteCapacityUnits={write_units}"
        ),
        op(
            "dynamodb",
            "update_table",
            json!({
                "TableName": "{table_name}",
                "ProvisionedThroughput": {
                    "ReadCapacityUnits": read_units,
                    "WriteCapacityUnits": write_units,
                },
            }),
        ),
    )]
}

pub fn enable_pitr_steps() -> Vec<Step> {
    vec![Step::new(
        1,
        "aws dynamodb update-continuous-backups --table-name {table_name} --point-in-time-recovery-specification PointInTimeRecoveryEnabled=true",
        op(
            "dynamodb",
            "update_continuous_backups",
            json!({
                "TableName": "{table_name}",
                "PointInTimeRecoverySpecification": {"PointInTimeRecoveryEnabled": true},
            }),
        ),
    )]
}

/// Step sequence for a model-derived recommendation, by (action, kind).
/// Combinations with no sensible provider sequence get an empty (advisory)
/// sequence.
pub fn steps_for_model_reco(reco: &ModelReco, kind: ResourceKind) -> Vec<Step> {
    match (reco.action, kind) {
        (RecoAction::Stop, ResourceKind::Compute) => stop_instance_steps(),
        (RecoAction::Resize, ResourceKind::Compute) => {
            match &reco.target_size {
                Some(size) => resize_instance_steps(size),
                // No target size to resize to; nothing executable.
                None => vec![],
            }
        }
        (RecoAction::Schedule, ResourceKind::Compute) => schedule_stop_steps(),
        (RecoAction::Monitor, ResourceKind::Compute) => enable_monitoring_steps(),
        (RecoAction::Schedule, ResourceKind::ObjectStore) => archive_lifecycle_steps(),
        (RecoAction::Resize, ResourceKind::Table) => {
            let units = reco
                .target_size
                .as_deref()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(5);
            reduce_throughput_steps(units, units)
        }
        _ => vec![],
    }
}
