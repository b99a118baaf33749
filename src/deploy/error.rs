use std::path::PathBuf;

use crate::cloudflare::ApiError;

use super::pipeline::Step;

/// A namespace, database or subdomain step that could not complete.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("{step} failed: {source}")]
    Step {
        step: Step,
        #[source]
        source: ApiError,
    },

    #[error("Deployment aborted by operator after {0} failed")]
    Aborted(Step),

    #[error("{0} ran out of order")]
    OutOfOrder(Step),

    #[error("Failed to read operator answer: {0}")]
    Prompt(#[from] std::io::Error),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Encoding or upload of the script. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Failed to read worker bundle {}: {source}", path.display())]
    Bundle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to download worker bundle from {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Failed to serialize script metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Script upload rejected: {0}")]
    Api(#[source] ApiError),
}

/// Custom domain attachment. Reported as a warning, never fatal.
#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("'{0}' is not a hostname under a public suffix")]
    InvalidHostname(String),

    #[error("No zone named '{0}' found in this account")]
    NoZone(String),

    #[error("Custom domain request failed: {0}")]
    Api(#[from] ApiError),
}

/// Operator input that cannot be deployed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}
