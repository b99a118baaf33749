//! Cloudflare login via OAuth 2.0 authorization code + PKCE.
//!
//! # Architecture
//!
//! - [`AuthSession`] - per-attempt state token and PKCE verifier/challenge
//! - [`CallbackListener`] - local axum server receiving the provider redirect
//! - [`AuthFlow`] - builds the authorization URL, opens the browser, waits
//! - [`TokenExchanger`] - code-for-token exchange, performed inside the callback
//!
//! The listener and the flow share a [`LoginSlot`]; the flow arms it with a
//! session and a one-shot sender, the listener resolves it exactly once.

pub mod browser;
pub mod callback;
pub mod error;
pub mod flow;
pub mod pkce;
pub mod token;

pub use browser::{SystemBrowser, UrlOpener};
pub use callback::{CallbackListener, CallbackParams, LoginSlot, error_html, success_html};
pub use error::AuthError;
pub use flow::{AuthFlow, build_authorize_url};
pub use pkce::AuthSession;
pub use token::{HttpTokenExchanger, ObtainedToken, TokenExchanger};

/// Every permission the provisioning steps need, requested up front.
pub const SCOPES: &[&str] = &[
    "account:read",
    "user:read",
    "workers:write",
    "workers_kv:write",
    "workers_routes:write",
    "workers_scripts:write",
    "workers_tail:read",
    "d1:write",
    "pages:write",
    "pages:read",
    "zone:read",
    "ssl_certs:write",
    "ai:write",
    "queues:write",
    "pipelines:write",
    "secrets_store:write",
];

/// Static OAuth client parameters.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuthSettings {
    /// Settings from the application config with the full scope set.
    pub fn from_config(config: &crate::config::OAuthConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            redirect_uri: config.redirect_uri(),
            scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
