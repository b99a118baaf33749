//! Script metadata and the bindings injected into the deployed worker.

use serde::Serialize;

use super::spec::DeploymentSpec;

/// One named resource or value exposed to the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Binding {
    PlainText { name: String, text: String },
    SecretText { name: String, text: String },
    KvNamespace { name: String, namespace_id: String },
    D1Database { name: String, database_id: String },
}

impl Binding {
    pub fn name(&self) -> &str {
        match self {
            Self::PlainText { name, .. }
            | Self::SecretText { name, .. }
            | Self::KvNamespace { name, .. }
            | Self::D1Database { name, .. } => name,
        }
    }

    fn secret(name: &str, text: &str) -> Self {
        Self::SecretText {
            name: name.to_string(),
            text: text.to_string(),
        }
    }
}

/// Bindings for a worker: database, namespace, the two required secrets and
/// `ROOT_PROXY_URL` when one was supplied.
pub fn worker_bindings(spec: &DeploymentSpec, namespace_id: &str, database_id: &str) -> Vec<Binding> {
    let mut bindings = vec![
        Binding::D1Database {
            name: "DB".to_string(),
            database_id: database_id.to_string(),
        },
        Binding::KvNamespace {
            name: "USER_KV".to_string(),
            namespace_id: namespace_id.to_string(),
        },
        Binding::secret("ADMIN_KEY", spec.admin_key()),
        Binding::secret("PROXYIP", spec.proxy_ip()),
    ];
    if let Some(url) = spec.root_proxy_url() {
        bindings.push(Binding::secret("ROOT_PROXY_URL", url));
    }
    bindings
}

/// The `metadata` part of a script upload.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptMetadata {
    pub main_module: String,
    pub bindings: Vec<Binding>,
    pub compatibility_date: String,
    pub compatibility_flags: Vec<String>,
}

impl ScriptMetadata {
    pub fn new(
        main_module: impl Into<String>,
        compatibility_date: impl Into<String>,
        compatibility_flags: Vec<String>,
        bindings: Vec<Binding>,
    ) -> Self {
        Self {
            main_module: main_module.into(),
            bindings,
            compatibility_date: compatibility_date.into(),
            compatibility_flags,
        }
    }
}

/// Today's date in UTC as `YYYY-MM-DD`.
pub fn today_compatibility_date() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}
