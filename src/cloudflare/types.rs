//! Wire types for the Cloudflare v4 REST API.

use serde::{Deserialize, Serialize};

/// Standard response envelope.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
}

/// One entry of the envelope's `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Account the deployment is scoped to. Resolved once, then only read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CloudAccount {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KvNamespace {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct D1Database {
    pub uuid: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptUpload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountSubdomain {
    pub subdomain: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

/// Request body for attaching a hostname to a script.
#[derive(Debug, Clone, Serialize)]
pub struct DomainAttachment {
    pub environment: String,
    pub hostname: String,
    pub service: String,
    pub zone_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkerDomain {
    #[serde(default)]
    pub id: Option<String>,
    pub hostname: String,
}
