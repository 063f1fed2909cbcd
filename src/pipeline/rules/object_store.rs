//! Rule table for object-storage buckets.

use super::{RecommendationRule, RuleContext};
use crate::pipeline::commands;
use crate::pipeline::types::{Impact, RecoType, Recommendation, Severity};

/// Share of the monthly cost lifecycle archival typically recovers.
const ARCHIVE_SAVING_SHARE: f64 = 0.3;

/// Bucket reachable from the public internet: block it.
pub struct BlockPublicAccessRule;

impl RecommendationRule for BlockPublicAccessRule {
    fn name(&self) -> &'static str {
        "object_store/block-public-access"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<Recommendation> {
        let bucket = ctx.bucket?;
        if bucket.public_access_blocked {
            return None;
        }
        Some(Recommendation::new(
            "Block Public Access",
            "Bucket allows public access; apply the account-wide public access block configuration.",
            RecoType::Security,
            Severity::Critical,
            format!("Bucket {} has public access enabled", ctx.resource_id),
            Impact::High,
            None,
            commands::block_public_access_steps(),
        ))
    }
}

/// Data at rest without server-side encryption.
pub struct BucketEncryptionRule;

impl RecommendationRule for BucketEncryptionRule {
    fn name(&self) -> &'static str {
        "object_store/enable-encryption"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<Recommendation> {
        let bucket = ctx.bucket?;
        if bucket.encryption_enabled {
            return None;
        }
        Some(Recommendation::new(
            "Enable server-side encryption",
            "Objects are stored unencrypted; enable AES-256 default encryption.",
            RecoType::Security,
            Severity::High,
            format!("Bucket {} stores data without encryption at rest", ctx.resource_id),
            Impact::Medium,
            None,
            commands::enable_bucket_encryption_steps(),
        ))
    }
}

/// No lifecycle policy: old objects sit in the expensive storage class.
pub struct ArchiveColdDataRule;

impl RecommendationRule for ArchiveColdDataRule {
    fn name(&self) -> &'static str {
        "object_store/archive-cold-data"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Option<Recommendation> {
        let bucket = ctx.bucket?;
        if bucket.lifecycle_configured {
            return None;
        }
        Some(Recommendation::new(
            "Archive old data to cold storage",
            "No lifecycle policy is configured; transition objects older than 90 days to cold storage.",
            RecoType::Cost,
            Severity::Warning,
            format!("Bucket {} has no lifecycle configuration", ctx.resource_id),
            Impact::Medium,
            Some(ctx.monthly_cost * ARCHIVE_SAVING_SHARE),
            commands::archive_lifecycle_steps(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{ResourceKind, ResourceStatus};
    use crate::provider::BucketSummary;

    fn bucket(public_blocked: bool, encrypted: bool, lifecycle: bool) -> BucketSummary {
        BucketSummary {
            name: "b".into(),
            region: "us-east-1".into(),
            public_access_blocked: public_blocked,
            encryption_enabled: encrypted,
            lifecycle_configured: lifecycle,
        }
    }

    fn ctx<'a>(b: &'a BucketSummary) -> RuleContext<'a> {
        RuleContext {
            resource_id: &b.name,
            kind: ResourceKind::ObjectStore,
            status: ResourceStatus::Running,
            utilization: 0.0,
            monthly_cost: 45.20,
            region: &b.region,
            bucket: Some(b),
            table: None,
        }
    }

    #[test]
    fn public_bucket_gets_critical_block() {
        let b = bucket(false, true, true);
        let reco = BlockPublicAccessRule.check(&ctx(&b)).unwrap();
        assert_eq!(reco.title, "Block Public Access");
        assert_eq!(reco.severity, Severity::Critical);

        let safe = bucket(true, true, true);
        assert!(BlockPublicAccessRule.check(&ctx(&safe)).is_none());
    }

    #[test]
    fn unencrypted_and_unarchived_buckets_fire() {
        let b = bucket(true, false, false);
        let c = ctx(&b);
        assert!(BucketEncryptionRule.check(&c).is_some());
        let archive = ArchiveColdDataRule.check(&c).unwrap();
        assert_eq!(archive.saving, Some(45.20 * ARCHIVE_SAVING_SHARE));
    }
}
