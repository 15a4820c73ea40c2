use anyhow::{Context, Result};
use identity_sight::{
    assignments::PrincipalPolicy,
    cli::{CommandLineArgs, GlobalArgs},
    provider::{aws::AwsProvider, snapshot::SnapshotProvider},
    run, RunOptions, RunSummary,
};
use tokio::runtime::Builder;
use tracing::{debug, info};
use tracing_core::metadata::LevelFilter;
use tracing_subscriber::{
    self, fmt, prelude::__tracing_subscriber_SubscriberExt, registry, util::SubscriberInitExt,
};

fn main() -> Result<()> {
    color_backtrace::install();
    let args = CommandLineArgs::parse_args();

    // every provider call is awaited in turn; one worker is enough
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;
    runtime.block_on(async_main(args))
}

fn setup_logging(global_args: &GlobalArgs) {
    let (level, all_targets) = global_args.log_level();
    let filter = if all_targets {
        tracing_subscriber::filter::Targets::new().with_default(level)
    } else {
        tracing_subscriber::filter::Targets::new()
            .with_default(LevelFilter::ERROR)
            .with_target("identity_sight", level)
    };
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(global_args.use_color(std::io::stderr()))
        .without_time();
    registry().with(fmt_layer).with(filter).init();
}

async fn async_main(args: CommandLineArgs) -> Result<()> {
    setup_logging(&args.global_args);

    let report = &args.report;
    let options = RunOptions {
        instance_arn: report.instance_arn.clone(),
        break_after: report.break_after(),
        policy: PrincipalPolicy::DEFAULT,
        output_dir: report.output_dir.clone(),
        json_out: report.json_out.clone(),
        quiet: args.global_args.quiet,
        progress: args.global_args.use_progress(),
    };
    debug!("Run options: {options:?}");

    let summary = match report.snapshot.as_deref() {
        Some(path) => {
            let provider = SnapshotProvider::from_path(path)?;
            run(&provider, &options).await
        }
        None => {
            let provider = AwsProvider::connect(&report.aws_settings()).await;
            run(&provider, &options).await
        }
    }
    .context("Failed to generate the Identity Center assignment report")?;

    log_summary(&summary);
    Ok(())
}

fn log_summary(summary: &RunSummary) {
    info!(
        "{} assignments across {} accounts for instance {} -> {}",
        summary.rows,
        summary.accounts,
        summary.instance_name,
        summary.report_path.display()
    );
}
