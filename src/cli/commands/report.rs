use std::path::PathBuf;

use clap::Args;

use crate::provider::aws::AwsSettings;

/// Collect IAM Identity Center account assignments and write an HTML report.
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Directory the HTML report is written to
    #[clap(long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Optional path to also write the collected assignment rows as JSON
    #[clap(long, value_name = "PATH")]
    pub json_out: Option<PathBuf>,

    /// Stop after this many accounts (partial report)
    #[clap(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub break_after: Option<u64>,

    /// IAM Identity Center instance ARN; required when more than one instance is visible
    #[clap(long, value_name = "ARN")]
    pub instance_arn: Option<String>,

    /// Read organization data from a JSON snapshot instead of calling AWS
    #[clap(long, value_name = "PATH")]
    pub snapshot: Option<PathBuf>,

    /// AWS profile name
    #[clap(long, value_name = "NAME", conflicts_with = "snapshot")]
    pub profile: Option<String>,

    /// AWS region (defaults to the environment/profile region, then us-east-1)
    #[clap(long, value_name = "REGION", conflicts_with = "snapshot")]
    pub region: Option<String>,

    /// Maximum attempts per AWS API call, including the first
    #[clap(long, value_name = "N", default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: u32,
}

impl ReportArgs {
    pub fn aws_settings(&self) -> AwsSettings {
        AwsSettings {
            profile: self.profile.clone(),
            region: self.region.clone(),
            max_attempts: Some(self.max_attempts),
        }
    }

    pub fn break_after(&self) -> Option<usize> {
        self.break_after.map(|n| usize::try_from(n).unwrap_or(usize::MAX))
    }
}
