use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::pipeline::types::{RecoStatus, ResourceKind};

#[derive(Parser)]
#[command(name = "cloudtrim")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Observe cloud resources, derive recommendations, and remediate them")]
#[command(
    long_about = "Observes compute instances, object-storage buckets, and key-value tables, derives cost/security/performance recommendations (from rule tables or an AWS Bedrock model), projects them as addressable alerts and security findings, and can execute the multi-step remediation sequences against the provider."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the persisted resource state (defaults to the user data dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Derive every kind from its static rule table (skip model calls)
    #[arg(long, global = true)]
    pub rules_only: bool,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List observed resources with their recommendations
    Resources {
        /// Restrict to one kind (compute, object-store, table)
        #[arg(long, value_enum)]
        kind: Option<KindArg>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show one stored resource
    Show {
        /// Resource identifier
        #[arg(value_name = "RESOURCE_ID")]
        resource_id: String,

        /// Resource kind
        #[arg(value_enum, value_name = "KIND")]
        kind: KindArg,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Run every executable recommendation's remediation sequence
    Optimize {
        /// Resource identifier
        #[arg(value_name = "RESOURCE_ID")]
        resource_id: String,

        /// Resource kind
        #[arg(value_enum, value_name = "KIND")]
        kind: KindArg,
    },

    /// List alerts projected from active recommendations
    Alerts {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Set the status of the recommendation behind an alert
    AlertStatus {
        /// Composite alert id (resource:Slugged~Title)
        #[arg(value_name = "ALERT_ID")]
        alert_id: String,

        /// New status
        #[arg(value_enum, value_name = "STATUS")]
        status: StatusArg,
    },

    /// List security findings with a severity/status summary
    Findings {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Show projected monthly/yearly savings across the fleet
    Savings {
        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Compute,
    ObjectStore,
    Table,
}

impl From<KindArg> for ResourceKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Compute => ResourceKind::Compute,
            KindArg::ObjectStore => ResourceKind::ObjectStore,
            KindArg::Table => ResourceKind::Table,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Active,
    Resolved,
    Suppressed,
}

impl From<StatusArg> for RecoStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Active => RecoStatus::Active,
            StatusArg::Resolved => RecoStatus::Resolved,
            StatusArg::Suppressed => RecoStatus::Suppressed,
        }
    }
}

impl Cli {
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}
