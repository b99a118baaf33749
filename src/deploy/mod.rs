//! Worker deployment: validation, provisioning, upload and domain binding.
//!
//! - [`DeploymentSpec`] - validated operator input
//! - [`NameAvailability`] - pre-flight script name lookup
//! - [`ResourceProvisioner`] - ordered namespace, database, upload, subdomain
//!   and custom-domain steps
//! - [`MultipartEncoder`] - upload body for the script and its metadata
//! - [`DomainBinder`] - hostname to zone resolution and attachment

pub mod availability;
pub mod bindings;
pub mod domain;
pub mod error;
pub mod multipart;
pub mod pipeline;
pub mod report;
pub mod spec;

pub use availability::NameAvailability;
pub use bindings::{Binding, ScriptMetadata, today_compatibility_date, worker_bindings};
pub use domain::{DomainBinder, DomainBinding, registrable_domain};
pub use error::{DomainError, ProvisionError, UploadError, ValidationError};
pub use multipart::{EncodedBody, MultipartEncoder};
pub use pipeline::{
    DeployContext, ProvisionedResources, Provisioned, ResourceProvisioner, Step, StepOutcome,
};
pub use report::DeploymentReport;
pub use spec::DeploymentSpec;
