//! Interactive login orchestration.
//!
//! [`AuthFlow::login`] mints a fresh [`AuthSession`], arms the callback
//! listener's [`LoginSlot`], shows the authorization URL, and then waits for
//! the listener to deliver a token (or for the deadline to pass).

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use super::OAuthSettings;
use super::browser::UrlOpener;
use super::callback::LoginSlot;
use super::error::AuthError;
use super::pkce::AuthSession;
use super::token::ObtainedToken;

/// Build the provider authorization URL for `session`.
///
/// Requests offline access so the provider also issues a refresh token.
pub fn build_authorize_url(settings: &OAuthSettings, session: &AuthSession) -> String {
    let scopes = settings.scopes.join(" ");
    format!(
        "{}?access_type=offline&client_id={}&code_challenge={}&code_challenge_method={}&redirect_uri={}&response_type=code&scope={}&state={}",
        settings.auth_url,
        urlencoding::encode(&settings.client_id),
        urlencoding::encode(&session.code_challenge),
        session.method(),
        urlencoding::encode(&settings.redirect_uri),
        urlencoding::encode(&scopes),
        urlencoding::encode(&session.state),
    )
}

/// Drives one browser-based login.
pub struct AuthFlow {
    settings: OAuthSettings,
    slot: LoginSlot,
    opener: Arc<dyn UrlOpener>,
    timeout: Duration,
}

impl AuthFlow {
    pub fn new(
        settings: OAuthSettings,
        slot: LoginSlot,
        opener: Arc<dyn UrlOpener>,
        timeout: Duration,
    ) -> Self {
        Self {
            settings,
            slot,
            opener,
            timeout,
        }
    }

    /// Run a login attempt to completion.
    ///
    /// A browser that fails to launch is reported, not fatal: the URL is
    /// printed so the operator can open it by hand, and the wait still
    /// applies.
    #[instrument(skip(self))]
    pub async fn login(&self) -> Result<ObtainedToken, AuthError> {
        let session = AuthSession::generate();
        let url = build_authorize_url(&self.settings, &session);

        let rx = self.slot.arm(session).await;

        println!("Opening Cloudflare login in your browser...");
        println!("If it does not open, visit this URL:\n\n  {url}\n");

        if let Err(e) = self.opener.open(&url) {
            warn!(error = %e, "Failed to open browser for login");
            eprintln!("Could not launch a browser ({e}); open the URL above manually.");
        }

        let outcome = tokio::time::timeout(self.timeout, rx).await;
        match outcome {
            Ok(Ok(result)) => {
                if result.is_ok() {
                    info!("Access token received");
                }
                result
            }
            Ok(Err(_)) => Err(AuthError::HandoffDropped),
            Err(_) => {
                if self.slot.disarm().await {
                    Err(AuthError::StateMismatch)
                } else {
                    Err(AuthError::Timeout(self.timeout.as_secs()))
                }
            }
        }
    }
}
