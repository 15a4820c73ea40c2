use std::{
    io::{self, Write},
    path::PathBuf,
    time::{Duration, Instant},
};

use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::{
    accounts::list_active_accounts,
    assignments::{collect_assignments, CollectOptions, PrincipalPolicy},
    error::ReportError,
    instance::locate_instance,
    permission_sets::list_permission_sets,
    provider::IdentityProvider,
    report::{render_report, write_json, write_report},
};

macro_rules! safe_println {
    ($($arg:tt)*) => {
        if let Err(e) = writeln!(io::stdout(), $($arg)*) {
            if e.kind() == io::ErrorKind::BrokenPipe {
                // the consumer went away
                std::process::exit(0);
            } else {
                panic!("stdout error: {}", e);
            }
        }
    };
}

/// Settings for a single report run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Instance to report on when the caller can see more than one.
    pub instance_arn: Option<String>,
    /// Stop collecting after this many accounts.
    pub break_after: Option<usize>,
    pub policy: PrincipalPolicy,
    pub output_dir: PathBuf,
    pub json_out: Option<PathBuf>,
    /// Suppress banners and the per-account counter.
    pub quiet: bool,
    /// Draw a progress bar on stderr while collecting.
    pub progress: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            instance_arn: None,
            break_after: None,
            policy: PrincipalPolicy::DEFAULT,
            output_dir: PathBuf::from("."),
            json_out: None,
            quiet: false,
            progress: false,
        }
    }
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report_path: PathBuf,
    pub instance_name: String,
    pub accounts: usize,
    pub rows: usize,
    pub elapsed: Duration,
}

/// `"<minutes> minutes and <seconds> seconds"`, both truncated.
pub fn format_elapsed(elapsed_secs: f64) -> String {
    let total = if elapsed_secs.is_finite() && elapsed_secs > 0.0 { elapsed_secs } else { 0.0 };
    let minutes = (total / 60.0).trunc() as u64;
    let seconds = (total % 60.0).trunc() as u64;
    format!("{minutes} minutes and {seconds} seconds")
}

struct Console {
    quiet: bool,
    bar: ProgressBar,
}

impl Console {
    fn new(options: &RunOptions) -> Self {
        Self { quiet: options.quiet, bar: ProgressBar::hidden() }
    }

    fn say(&self, message: &str) {
        if self.quiet {
            return;
        }
        if self.bar.is_hidden() {
            safe_println!("{message}");
        } else {
            self.bar.println(message);
        }
    }

    fn start_progress(&mut self, total: usize, enabled: bool) {
        if self.quiet || !enabled {
            return;
        }
        let style = ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        self.bar = ProgressBar::new(total as u64).with_style(style).with_message("Accounts");
        self.bar.enable_steady_tick(Duration::from_millis(500));
    }

    fn account_done(&self, completed: usize, total: usize) {
        self.say(&format!("✅ {completed}/{total} Done"));
        self.bar.inc(1);
    }

    fn finish_progress(&mut self) {
        self.bar.finish_and_clear();
        self.bar = ProgressBar::hidden();
    }
}

/// Run the whole pipeline: accounts, instance, permission sets, assignments, report.
///
/// Any error aborts the run before a report file is written.
pub async fn run<P: IdentityProvider>(
    provider: &P,
    options: &RunOptions,
) -> Result<RunSummary, ReportError> {
    let started = Instant::now();
    let mut console = Console::new(options);

    console.say("🗼 AWS Identity Sight 🗼\n\n");
    console.say("ℹ️  Generating AWS Identity Center Assignment Report...\n");

    let accounts = list_active_accounts(provider).await?;
    let located = locate_instance(provider, options.instance_arn.as_deref()).await?;
    let catalog = list_permission_sets(provider, &located.instance.instance_arn).await?;

    console.say("🔎 Gathering Data for Accounts:");
    console.start_progress(accounts.len(), options.progress);
    let collect_options = CollectOptions { break_after: options.break_after, policy: options.policy };
    let collected = collect_assignments(
        provider,
        &accounts,
        &located.instance,
        &catalog,
        &collect_options,
        |completed, total| console.account_done(completed, total),
    )
    .await;
    console.finish_progress();
    let rows = collected?;

    console.say("📂  Writing the report to an HTML file...");
    let html = render_report(&rows, &located.display_name)?;
    let report_path = write_report(&html, &options.output_dir, &Local::now().naive_local())?;
    info!("Report written to {}", report_path.display());

    if let Some(json_out) = options.json_out.as_deref() {
        write_json(&rows, json_out)?;
        info!("Assignment rows written to {}", json_out.display());
    }

    let elapsed = started.elapsed();
    console.say(&format!(
        "The report took {} to generate.",
        format_elapsed(elapsed.as_secs_f64())
    ));

    Ok(RunSummary {
        report_path,
        instance_name: located.display_name,
        accounts: accounts.len(),
        rows: rows.len(),
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_is_truncated_not_rounded() {
        assert_eq!(format_elapsed(125.7), "2 minutes and 5 seconds");
        assert_eq!(format_elapsed(59.99), "0 minutes and 59 seconds");
        assert_eq!(format_elapsed(3600.0), "60 minutes and 0 seconds");
        assert_eq!(format_elapsed(0.0), "0 minutes and 0 seconds");
    }

    #[test]
    fn nonsensical_durations_read_as_zero() {
        assert_eq!(format_elapsed(-3.0), "0 minutes and 0 seconds");
        assert_eq!(format_elapsed(f64::NAN), "0 minutes and 0 seconds");
    }
}
