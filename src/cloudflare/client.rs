//! reqwest-backed implementation of [`CloudApi`].

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::CloudApi;
use super::error::ApiError;
use super::types::{
    AccountSubdomain, CloudAccount, D1Database, DomainAttachment, Envelope, KvNamespace,
    ScriptUpload, WorkerDomain, Zone,
};

/// Authenticated Cloudflare REST client.
///
/// Every request carries the bearer token it was built with; the account a
/// call targets is passed per call.
#[derive(Clone)]
pub struct CloudClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

impl std::fmt::Debug for CloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudClient")
            .field("api_base", &self.api_base)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl CloudClient {
    pub fn new(http: reqwest::Client, api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.url(path)).bearer_auth(&self.token)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.http.post(self.url(path)).bearer_auth(&self.token)
    }

    fn put(&self, path: &str) -> RequestBuilder {
        self.http.put(self.url(path)).bearer_auth(&self.token)
    }

    /// Send `request` and unwrap the envelope's `result`.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &'static str,
    ) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        let envelope: Envelope<T> = match serde_json::from_str(&body) {
            Ok(env) => env,
            Err(e) if status.is_success() => {
                return Err(ApiError::Decode(format!("{what}: {e}")));
            }
            Err(_) => {
                return Err(ApiError::Api {
                    status: status.as_u16(),
                    errors: Vec::new(),
                });
            }
        };

        if !status.is_success() || !envelope.success {
            warn!(what, status = status.as_u16(), errors = ?envelope.errors, "Cloudflare call failed");
            return Err(ApiError::Api {
                status: status.as_u16(),
                errors: envelope.errors,
            });
        }

        envelope.result.ok_or(ApiError::MissingResult(what))
    }

    /// Like [`send`](Self::send) but discards the result body.
    async fn send_unit(&self, request: RequestBuilder, what: &'static str) -> Result<(), ApiError> {
        self.send::<Option<serde_json::Value>>(request, what)
            .await
            .map(|_| ())
            .or_else(|e| match e {
                ApiError::MissingResult(_) => Ok(()),
                other => Err(other),
            })
    }
}

#[async_trait]
impl CloudApi for CloudClient {
    #[instrument(skip(self))]
    async fn list_accounts(&self) -> Result<Vec<CloudAccount>, ApiError> {
        self.send(self.get("/accounts"), "accounts").await
    }

    #[instrument(skip(self))]
    async fn script_exists(&self, account_id: &str, name: &str) -> Result<bool, ApiError> {
        let path = format!("/accounts/{account_id}/workers/scripts/{name}");
        let response = self.get(&path).send().await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let errors = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                    .map(|env| env.errors)
                    .unwrap_or_default();
                Err(ApiError::Api {
                    status: status.as_u16(),
                    errors,
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn create_kv_namespace(&self, account_id: &str, title: &str) -> Result<KvNamespace, ApiError> {
        let path = format!("/accounts/{account_id}/storage/kv/namespaces");
        let ns: KvNamespace = self
            .send(self.post(&path).json(&json!({ "title": title })), "kv namespace")
            .await?;
        debug!(id = %ns.id, "KV namespace created");
        Ok(ns)
    }

    #[instrument(skip(self))]
    async fn create_d1_database(&self, account_id: &str, name: &str) -> Result<D1Database, ApiError> {
        let path = format!("/accounts/{account_id}/d1/database");
        let db: D1Database = self
            .send(self.post(&path).json(&json!({ "name": name })), "d1 database")
            .await?;
        debug!(uuid = %db.uuid, "D1 database created");
        Ok(db)
    }

    #[instrument(skip(self, body), fields(bytes = body.len()))]
    async fn upload_script(
        &self,
        account_id: &str,
        name: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<ScriptUpload, ApiError> {
        let path = format!("/accounts/{account_id}/workers/scripts/{name}");
        let request = self
            .put(&path)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        self.send(request, "script upload").await
    }

    #[instrument(skip(self))]
    async fn enable_script_subdomain(&self, account_id: &str, name: &str) -> Result<(), ApiError> {
        let path = format!("/accounts/{account_id}/workers/scripts/{name}/subdomain");
        self.send_unit(self.post(&path).json(&json!({ "enabled": true })), "script subdomain")
            .await
    }

    #[instrument(skip(self))]
    async fn account_subdomain(&self, account_id: &str) -> Result<String, ApiError> {
        let path = format!("/accounts/{account_id}/workers/subdomain");
        let sub: AccountSubdomain = self.send(self.get(&path), "account subdomain").await?;
        Ok(sub.subdomain)
    }

    #[instrument(skip(self))]
    async fn list_zones(&self, account_id: &str, name: &str) -> Result<Vec<Zone>, ApiError> {
        let request = self
            .get("/zones")
            .query(&[("name", name), ("account.id", account_id)]);
        self.send(request, "zones").await
    }

    #[instrument(skip(self, attachment), fields(hostname = %attachment.hostname))]
    async fn attach_domain(
        &self,
        account_id: &str,
        attachment: &DomainAttachment,
    ) -> Result<WorkerDomain, ApiError> {
        let path = format!("/accounts/{account_id}/workers/domains");
        self.send(self.put(&path).json(attachment), "worker domain").await
    }
}
