//! Authorization-code exchange against the provider's token endpoint.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::OAuthSettings;
use super::error::AuthError;

/// Credential delivered by the callback listener.
///
/// Ownership moves to the waiting flow on delivery; nothing else keeps a copy.
#[derive(Clone, PartialEq)]
pub struct ObtainedToken {
    /// Bearer credential used for every provider API call.
    pub access_token: String,
    /// Refresh credential, when the provider issued one.
    pub refresh_token: Option<String>,
    /// Unix timestamp when the access token expires, if known.
    pub expires_at: Option<i64>,
    /// Token type, typically "bearer".
    pub token_type: String,
}

impl std::fmt::Debug for ObtainedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObtainedToken")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("token_type", &self.token_type)
            .finish()
    }
}

impl ObtainedToken {
    /// Build a token from an `expires_in` duration relative to now.
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: Option<i64>,
        token_type: Option<String>,
    ) -> Self {
        let expires_at = expires_in.map(|ei| chrono::Utc::now().timestamp() + ei);
        Self {
            access_token,
            refresh_token,
            expires_at,
            token_type: token_type.unwrap_or_else(|| "bearer".to_string()),
        }
    }
}

/// Turns an authorization code plus verifier into a token.
///
/// Abstracted so the callback listener can be exercised without a real
/// token endpoint.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, code: &str, code_verifier: &str) -> Result<ObtainedToken, AuthError>;
}

/// Token response from the provider's token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Error response from the provider's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Form-encoded exchange over HTTP.
pub struct HttpTokenExchanger {
    http_client: reqwest::Client,
    settings: OAuthSettings,
}

impl HttpTokenExchanger {
    pub fn new(http_client: reqwest::Client, settings: OAuthSettings) -> Self {
        Self {
            http_client,
            settings,
        }
    }
}

#[async_trait]
impl TokenExchanger for HttpTokenExchanger {
    #[instrument(skip_all)]
    async fn exchange(&self, code: &str, code_verifier: &str) -> Result<ObtainedToken, AuthError> {
        debug!("Exchanging authorization code for tokens");

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("client_id", self.settings.client_id.as_str()),
            ("code_verifier", code_verifier),
        ];

        let response = self
            .http_client
            .post(&self.settings.token_url)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::ExchangeFailed(format!("token request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::ExchangeFailed(format!("token response unreadable: {e}")))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<TokenErrorResponse>(&body) {
                warn!(
                    error = %error.error,
                    description = ?error.error_description,
                    "Token exchange rejected"
                );
                return Err(AuthError::ExchangeFailed(
                    error.error_description.unwrap_or(error.error),
                ));
            }
            return Err(AuthError::ExchangeFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            AuthError::ExchangeFailed(format!("Failed to parse token response: {e}"))
        })?;

        debug!("Token exchange successful");

        Ok(ObtainedToken::new(
            token.access_token,
            token.refresh_token,
            token.expires_in,
            token.token_type,
        ))
    }
}
