//! Enumerate IAM Identity Center account assignments across an AWS Organization and
//! render them as a static HTML report grouped by account.

pub mod accounts;
pub mod assignments;
pub mod cli;
pub mod error;
pub mod instance;
pub mod model;
pub mod permission_sets;
pub mod provider;
pub mod report;
pub mod runner;

pub use error::{ProviderError, ReportError};
pub use runner::{format_elapsed, run, RunOptions, RunSummary};
