use crate::cloudflare::ResolveAccountError;
use crate::deploy::{ProvisionError, UploadError, ValidationError};
use crate::oauth::AuthError;
use crate::prompt::CollectError;

/// Unified application error for the deployer binary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Login failed: {0}")]
    Auth(#[from] AuthError),

    #[error("No Cloudflare credential: log in via OAuth or set CLOUDFLARE_API_TOKEN")]
    NoCredential,

    #[error("Could not resolve Cloudflare account: {0}")]
    Account(#[from] ResolveAccountError),

    #[error("Invalid deployment settings: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Input(#[from] CollectError),

    #[error("Worker name '{0}' is already taken. Please choose another name.")]
    NameTaken(String),

    #[error("Deployment cancelled: {0}")]
    Cancelled(String),

    #[error("Deployment failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Worker upload failed: {0}")]
    Upload(#[from] UploadError),
}

impl AppError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) | Self::Input(CollectError::Invalid(_)) | Self::NameTaken(_) => 2,
            Self::Cancelled(_) => 130,
            _ => 1,
        }
    }
}
