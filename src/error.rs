use std::path::PathBuf;

use thiserror::Error;

/// A failed call against the identity provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The service answered that the requested resource does not exist.
    #[error("{operation}: resource not found: {message}")]
    NotFound { operation: &'static str, message: String },

    /// Any other failure (transport, throttling, access denied, malformed response).
    #[error("{operation} failed: {message}")]
    Api { operation: &'static str, message: String },
}

impl ProviderError {
    pub fn not_found(operation: &'static str, message: impl Into<String>) -> Self {
        ProviderError::NotFound { operation, message: message.into() }
    }

    pub fn api(operation: &'static str, message: impl Into<String>) -> Self {
        ProviderError::Api { operation, message: message.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }

    pub fn operation(&self) -> &'static str {
        match self {
            ProviderError::NotFound { operation, .. } | ProviderError::Api { operation, .. } => {
                operation
            }
        }
    }
}

/// Errors that abort a report run.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("no IAM Identity Center instance is available to the caller")]
    NoInstances,

    #[error(
        "found {} IAM Identity Center instances ({}); select one with --instance-arn",
        .arns.len(),
        .arns.join(", ")
    )]
    AmbiguousInstance { arns: Vec<String> },

    #[error("IAM Identity Center instance {0} was not found")]
    UnknownInstance(String),

    #[error("failed to render report: {0}")]
    Template(#[from] liquid::Error),

    #[error("failed to serialize report rows: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load snapshot {}: {message}", .path.display())]
    Snapshot { path: PathBuf, message: String },
}
