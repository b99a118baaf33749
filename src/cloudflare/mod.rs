//! Cloudflare REST API surface used by the deployer.

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;

pub use client::CloudClient;
pub use error::ApiError;
pub use types::{
    ApiMessage, CloudAccount, D1Database, DomainAttachment, KvNamespace, ScriptUpload,
    WorkerDomain, Zone,
};

/// Account-scoped operations the provisioning pipeline performs.
///
/// Implemented over HTTP by [`CloudClient`]; tests substitute in-memory fakes.
#[async_trait]
pub trait CloudApi: Send + Sync {
    async fn list_accounts(&self) -> Result<Vec<CloudAccount>, ApiError>;

    /// `true` on HTTP 200, `false` on 404, error otherwise.
    async fn script_exists(&self, account_id: &str, name: &str) -> Result<bool, ApiError>;

    async fn create_kv_namespace(&self, account_id: &str, title: &str) -> Result<KvNamespace, ApiError>;

    async fn create_d1_database(&self, account_id: &str, name: &str) -> Result<D1Database, ApiError>;

    async fn upload_script(
        &self,
        account_id: &str,
        name: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<ScriptUpload, ApiError>;

    async fn enable_script_subdomain(&self, account_id: &str, name: &str) -> Result<(), ApiError>;

    /// The account's `workers.dev` label, without the suffix.
    async fn account_subdomain(&self, account_id: &str) -> Result<String, ApiError>;

    async fn list_zones(&self, account_id: &str, name: &str) -> Result<Vec<Zone>, ApiError>;

    async fn attach_domain(
        &self,
        account_id: &str,
        attachment: &DomainAttachment,
    ) -> Result<WorkerDomain, ApiError>;
}

/// Pick the account to deploy into: the pinned id if given, else the first
/// account the credential can list.
///
/// A pinned id is used as-is. The listing only supplies its display name, and
/// a listing that fails or omits the id falls back to the id itself.
pub async fn resolve_account(
    api: &dyn CloudApi,
    pinned: Option<&str>,
) -> Result<CloudAccount, ResolveAccountError> {
    let Some(id) = pinned else {
        let accounts = api.list_accounts().await?;
        return accounts.into_iter().next().ok_or(ResolveAccountError::NoAccounts);
    };

    let name = match api.list_accounts().await {
        Ok(accounts) => accounts.into_iter().find(|a| a.id == id).map(|a| a.name),
        Err(e) => {
            tracing::debug!(error = %e, "Account listing failed, using pinned id as name");
            None
        }
    };
    Ok(CloudAccount {
        id: id.to_string(),
        name: name.unwrap_or_else(|| id.to_string()),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveAccountError {
    #[error("The credential has access to no Cloudflare accounts")]
    NoAccounts,

    #[error(transparent)]
    Api(#[from] ApiError),
}
