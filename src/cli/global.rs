use std::io::IsTerminal;

use clap::{ArgAction, Args, Parser, ValueEnum};
use strum::Display;
use tracing_core::metadata::LevelFilter;

use crate::cli::commands::report::ReportArgs;

#[deny(missing_docs)]
#[derive(Parser, Debug)]
#[command(version = env!("CARGO_PKG_VERSION"))]
/// Identity Sight - Report AWS IAM Identity Center account assignments across an organization
pub struct CommandLineArgs {
    /// Report options
    #[command(flatten)]
    pub report: ReportArgs,

    /// Global arguments
    #[command(flatten)]
    pub global_args: GlobalArgs,
}

impl CommandLineArgs {
    /// Parse command-line arguments.
    ///
    /// Respects `NO_COLOR` and maps `--quiet` into disabling progress bars.
    pub fn parse_args() -> Self {
        let mut args = CommandLineArgs::parse();

        if std::env::var("NO_COLOR").is_ok() {
            args.global_args.color = Mode::Never;
        }

        if args.global_args.quiet {
            args.global_args.progress = Mode::Never;
        }

        args
    }
}

/// Top-level global CLI arguments
#[derive(Args, Debug, Clone)]
#[command(next_help_heading = "Global Options")]
pub struct GlobalArgs {
    /// Enable verbose output (up to 3 times for more detail)
    #[arg(global = true, long = "verbose", short = 'v', action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error messages and disable progress bars
    #[arg(global = true, long, short)]
    pub quiet: bool,

    /// Show a progress bar while collecting assignments: auto, never or always
    #[arg(global = true, long, value_name = "MODE", default_value_t = Mode::Auto)]
    pub progress: Mode,

    // Internal fields (not CLI arguments)
    #[clap(skip)]
    pub color: Mode,
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self { verbose: 0, quiet: false, progress: Mode::Auto, color: Mode::Auto }
    }
}

impl GlobalArgs {
    pub fn use_color<T: IsTerminal>(&self, out: T) -> bool {
        match self.color {
            Mode::Never => false,
            Mode::Always => true,
            Mode::Auto => out.is_terminal(),
        }
    }

    pub fn use_progress(&self) -> bool {
        match self.progress {
            Mode::Never => false,
            Mode::Always => true,
            Mode::Auto => std::io::stderr().is_terminal(),
        }
    }

    /// Level for this crate's own log target, and whether every other target is
    /// raised to the same level.
    pub fn log_level(&self) -> (LevelFilter, bool) {
        if self.quiet {
            return (LevelFilter::ERROR, false);
        }
        match self.verbose {
            0 => (LevelFilter::INFO, false),
            1 => (LevelFilter::DEBUG, false),
            2 => (LevelFilter::TRACE, false),
            _ => (LevelFilter::TRACE, true),
        }
    }
}

/// Generic mode with `auto/never/always`.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Default)]
#[strum(serialize_all = "kebab-case")]
pub enum Mode {
    #[default]
    Auto,
    Never,
    Always,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        let mut args = GlobalArgs::default();
        assert_eq!(args.log_level(), (LevelFilter::INFO, false));
        args.verbose = 2;
        assert_eq!(args.log_level(), (LevelFilter::TRACE, false));
        args.verbose = 3;
        assert_eq!(args.log_level(), (LevelFilter::TRACE, true));
        args.quiet = true;
        assert_eq!(args.log_level(), (LevelFilter::ERROR, false));
    }

    #[test]
    fn progress_mode_overrides_terminal_detection() {
        let args = GlobalArgs { progress: Mode::Never, ..GlobalArgs::default() };
        assert!(!args.use_progress());
        let args = GlobalArgs { progress: Mode::Always, ..GlobalArgs::default() };
        assert!(args.use_progress());
    }

    #[test]
    fn no_arguments_is_a_full_run() {
        let args = CommandLineArgs::try_parse_from(["identity-sight"]).unwrap();
        assert!(args.report.break_after.is_none());
        assert!(args.report.snapshot.is_none());
        assert_eq!(args.report.output_dir, std::path::PathBuf::from("."));
    }

    #[test]
    fn break_after_must_be_positive() {
        assert!(CommandLineArgs::try_parse_from(["identity-sight", "--break-after", "0"]).is_err());
        let args = CommandLineArgs::try_parse_from(["identity-sight", "--break-after", "2"]).unwrap();
        assert_eq!(args.report.break_after, Some(2));
    }
}
