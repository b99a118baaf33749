//! Ordered resource provisioning.
//!
//! ```text
//! CreateNamespace ─┐
//!                  ├─> UploadScript ─> EnableSubdomain ─> [AttachCustomDomain]
//! CreateDatabase ──┘
//! ```
//!
//! Namespace and database creation may be retried by the operator; nothing
//! already created is removed. Upload and subdomain failures end the run. A
//! custom domain failure only adds a warning to the report.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use tracing::{error, info, instrument, warn};

use crate::cloudflare::{ApiError, CloudAccount, CloudApi};
use crate::prompt::{self, Prompter};

use super::bindings::{ScriptMetadata, worker_bindings};
use super::domain::{DomainBinder, DomainBinding};
use super::error::{ProvisionError, UploadError};
use super::multipart::MultipartEncoder;
use super::report::DeploymentReport;
use super::spec::DeploymentSpec;

/// Suffix of every account subdomain.
const WORKERS_DEV: &str = "workers.dev";

/// Error text the account-level subdomain endpoint returns on a repeat call.
/// The per-script endpoint used here is idempotent and does not send it; the
/// match stays so a provider reply in that shape is still not treated as fatal.
const SUBDOMAIN_EXISTS: &str = "already exists";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    CreateNamespace,
    CreateDatabase,
    UploadScript,
    EnableSubdomain,
    AttachCustomDomain,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::CreateNamespace => "KV namespace creation",
            Step::CreateDatabase => "D1 database creation",
            Step::UploadScript => "worker upload",
            Step::EnableSubdomain => "workers.dev subdomain enablement",
            Step::AttachCustomDomain => "custom domain attachment",
        })
    }
}

/// Result of one attempt at a step.
#[derive(Debug)]
pub enum StepOutcome<T> {
    Success(T),
    /// The operator may retry or abort.
    Retryable(ApiError),
    Fatal(ProvisionError),
}

/// Identifiers minted by the pipeline. Each is set once by its step.
#[derive(Debug, Default)]
pub struct ProvisionedResources {
    namespace_id: OnceLock<String>,
    database_id: OnceLock<String>,
    script: OnceLock<String>,
    subdomain: OnceLock<String>,
    domain: OnceLock<DomainBinding>,
}

impl ProvisionedResources {
    pub fn namespace_id(&self) -> Option<&str> {
        self.namespace_id.get().map(String::as_str)
    }

    pub fn database_id(&self) -> Option<&str> {
        self.database_id.get().map(String::as_str)
    }

    pub fn script(&self) -> Option<&str> {
        self.script.get().map(String::as_str)
    }

    /// Full account subdomain, e.g. `acme.workers.dev`.
    pub fn subdomain(&self) -> Option<&str> {
        self.subdomain.get().map(String::as_str)
    }

    pub fn domain(&self) -> Option<&DomainBinding> {
        self.domain.get()
    }

    pub fn zone_id(&self) -> Option<&str> {
        self.domain.get().map(|d| d.zone.id.as_str())
    }
}

fn record<T>(cell: &OnceLock<T>, value: T, step: Step) -> Result<(), ProvisionError> {
    cell.set(value).map_err(|_| ProvisionError::OutOfOrder(step))
}

fn require(value: Option<&str>, step: Step) -> Result<&str, ProvisionError> {
    value.ok_or(ProvisionError::OutOfOrder(step))
}

/// Everything the pipeline reads but never changes.
#[derive(Clone)]
pub struct DeployContext {
    pub api: Arc<dyn CloudApi>,
    pub account: CloudAccount,
    pub bundle_path: PathBuf,
    pub main_module: String,
    pub compatibility_date: String,
    pub compatibility_flags: Vec<String>,
}

/// Provisioned resources plus the operator-facing summary.
#[derive(Debug)]
pub struct Provisioned {
    pub resources: ProvisionedResources,
    pub report: DeploymentReport,
}

/// Runs the provisioning steps for one [`DeploymentSpec`].
pub struct ResourceProvisioner<'a> {
    ctx: &'a DeployContext,
    prompter: &'a dyn Prompter,
    encoder: MultipartEncoder,
}

impl<'a> ResourceProvisioner<'a> {
    pub fn new(ctx: &'a DeployContext, prompter: &'a dyn Prompter) -> Self {
        Self {
            ctx,
            prompter,
            encoder: MultipartEncoder::new(),
        }
    }

    #[instrument(skip_all, fields(worker = %spec.name(), account = %self.ctx.account.id))]
    pub async fn run(&self, spec: &DeploymentSpec) -> Result<Provisioned, ProvisionError> {
        let resources = ProvisionedResources::default();
        let mut warnings = Vec::new();

        let namespace_id = self
            .drive(Step::CreateNamespace, move || self.create_namespace(spec))
            .await?;
        record(&resources.namespace_id, namespace_id, Step::CreateNamespace)?;

        let database_id = self
            .drive(Step::CreateDatabase, move || self.create_database(spec))
            .await?;
        record(&resources.database_id, database_id, Step::CreateDatabase)?;

        let res = &resources;
        let script = self
            .drive(Step::UploadScript, move || self.upload_script(spec, res))
            .await?;
        record(&resources.script, script, Step::UploadScript)?;

        let subdomain = self
            .drive(Step::EnableSubdomain, move || self.enable_subdomain(spec))
            .await?;
        record(&resources.subdomain, subdomain, Step::EnableSubdomain)?;

        if let Some(hostname) = spec.custom_domain() {
            match self.attach_domain(spec, hostname).await {
                Ok(binding) => {
                    prompt::status_ok(&format!("Custom domain {} attached", binding.hostname));
                    record(&resources.domain, binding, Step::AttachCustomDomain)?;
                }
                Err(e) => {
                    warn!(hostname, error = %e, "Custom domain not attached");
                    warnings.push(format!("Custom domain {hostname} was not attached: {e}"));
                }
            }
        }

        let host = match resources.domain() {
            Some(binding) => binding.hostname.clone(),
            None => format!(
                "{}.{}",
                spec.name(),
                require(resources.subdomain(), Step::EnableSubdomain)?
            ),
        };

        let report = DeploymentReport {
            panel_url: DeploymentReport::panel_url_for(&host),
            database_name: spec.database_name(),
            warnings,
        };
        info!(panel_url = %report.panel_url, "Deployment finished");

        Ok(Provisioned { resources, report })
    }

    /// Attempt `step` until it succeeds, fails fatally, or the operator aborts.
    async fn drive<T, F, Fut>(&self, step: Step, mut attempt: F) -> Result<T, ProvisionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StepOutcome<T>>,
    {
        loop {
            match attempt().await {
                StepOutcome::Success(value) => {
                    prompt::status_ok(&format!("{step} done"));
                    return Ok(value);
                }
                StepOutcome::Fatal(e) => {
                    error!(%step, error = %e, "Step failed");
                    prompt::status_err(&format!("{step} failed: {e}"));
                    return Err(e);
                }
                StepOutcome::Retryable(e) => {
                    warn!(%step, status = ?e.status(), error = %e, "Step failed, asking operator");
                    prompt::status_err(&format!("{step} failed: {e}"));
                    if !self.prompter.confirm(&format!("Retry {step}?"), true)? {
                        return Err(ProvisionError::Aborted(step));
                    }
                    info!(%step, "Retrying");
                }
            }
        }
    }

    async fn create_namespace(&self, spec: &DeploymentSpec) -> StepOutcome<String> {
        let title = spec.kv_namespace_title();
        info!(%title, "Creating KV namespace");
        match self
            .ctx
            .api
            .create_kv_namespace(&self.ctx.account.id, &title)
            .await
        {
            Ok(ns) => {
                info!(namespace_id = %ns.id, "KV namespace created");
                StepOutcome::Success(ns.id)
            }
            Err(e) => StepOutcome::Retryable(e),
        }
    }

    async fn create_database(&self, spec: &DeploymentSpec) -> StepOutcome<String> {
        let name = spec.database_name();
        info!(%name, "Creating D1 database");
        match self
            .ctx
            .api
            .create_d1_database(&self.ctx.account.id, &name)
            .await
        {
            Ok(db) => {
                info!(database_id = %db.uuid, "D1 database created");
                StepOutcome::Success(db.uuid)
            }
            Err(e) => StepOutcome::Retryable(e),
        }
    }

    async fn upload_script(
        &self,
        spec: &DeploymentSpec,
        resources: &ProvisionedResources,
    ) -> StepOutcome<String> {
        let ids = require(resources.namespace_id(), Step::UploadScript).and_then(|ns| {
            require(resources.database_id(), Step::UploadScript).map(|db| (ns, db))
        });
        let (namespace_id, database_id) = match ids {
            Ok(ids) => ids,
            Err(e) => return StepOutcome::Fatal(e),
        };

        let metadata = ScriptMetadata::new(
            self.ctx.main_module.clone(),
            self.ctx.compatibility_date.clone(),
            self.ctx.compatibility_flags.clone(),
            worker_bindings(spec, namespace_id, database_id),
        );
        let body = match self.encoder.encode_file(&metadata, &self.ctx.bundle_path).await {
            Ok(body) => body,
            Err(e) => return StepOutcome::Fatal(e.into()),
        };

        info!(
            worker = %spec.name(),
            bindings = metadata.bindings.len(),
            bytes = body.bytes.len(),
            "Uploading worker"
        );
        match self
            .ctx
            .api
            .upload_script(&self.ctx.account.id, spec.name(), &body.content_type, body.bytes)
            .await
        {
            Ok(_) => StepOutcome::Success(spec.name().to_string()),
            Err(e) => StepOutcome::Fatal(UploadError::Api(e).into()),
        }
    }

    async fn enable_subdomain(&self, spec: &DeploymentSpec) -> StepOutcome<String> {
        let account_id = &self.ctx.account.id;
        match self.ctx.api.enable_script_subdomain(account_id, spec.name()).await {
            Ok(()) => {}
            Err(e) if e.mentions(SUBDOMAIN_EXISTS) => {
                info!("workers.dev subdomain already enabled");
            }
            Err(e) => {
                return StepOutcome::Fatal(ProvisionError::Step {
                    step: Step::EnableSubdomain,
                    source: e,
                });
            }
        }

        match self.ctx.api.account_subdomain(account_id).await {
            Ok(sub) => StepOutcome::Success(format!("{sub}.{WORKERS_DEV}")),
            Err(e) => StepOutcome::Fatal(ProvisionError::Step {
                step: Step::EnableSubdomain,
                source: e,
            }),
        }
    }

    async fn attach_domain(
        &self,
        spec: &DeploymentSpec,
        hostname: &str,
    ) -> Result<DomainBinding, super::error::DomainError> {
        DomainBinder::new(self.ctx.api.as_ref(), &self.ctx.account)
            .bind(spec.name(), hostname)
            .await
    }
}
