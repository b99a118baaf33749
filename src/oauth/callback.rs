//! Local OAuth redirect target.
//!
//! A short-lived axum server with a single `GET` route. The provider
//! redirects the operator's browser here with `?code=...&state=...`; the
//! handler checks `state` against the pending [`AuthSession`], exchanges the
//! code on the spot and hands the result to the waiting flow through a
//! one-shot channel.
//!
//! The listener outlives individual login attempts: the flow arms the shared
//! [`LoginSlot`] with a fresh session each time it starts waiting.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::error::AuthError;
use super::pkce::AuthSession;
use super::token::{ObtainedToken, TokenExchanger};

/// What the flow eventually receives from the listener.
pub type LoginResult = Result<ObtainedToken, AuthError>;

/// Query parameters from the OAuth callback.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// A login attempt waiting for its redirect.
struct PendingLogin {
    session: AuthSession,
    reply: oneshot::Sender<LoginResult>,
    /// Set once a callback with the wrong state has been turned away.
    saw_forged_state: bool,
}

/// Shared slot holding at most one pending login.
///
/// The sender inside is taken out exactly once, when a callback with the
/// right state arrives, so at most one value is ever delivered per attempt.
#[derive(Clone, Default)]
pub struct LoginSlot {
    inner: Arc<Mutex<Option<PendingLogin>>>,
}

impl LoginSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` as the pending login and return the receiving end
    /// of its handoff. Any previous attempt is discarded; its receiver then
    /// resolves to a closed-channel error.
    pub async fn arm(&self, session: AuthSession) -> oneshot::Receiver<LoginResult> {
        let (reply, rx) = oneshot::channel();
        let mut guard = self.inner.lock().await;
        if guard.replace(PendingLogin {
            session,
            reply,
            saw_forged_state: false,
        }).is_some() {
            debug!("Replaced a previous pending login");
        }
        rx
    }

    /// Drop the pending login, if any. Returns whether it had rejected a
    /// callback carrying the wrong state.
    pub async fn disarm(&self) -> bool {
        self.inner
            .lock()
            .await
            .take()
            .is_some_and(|p| p.saw_forged_state)
    }

    /// Whether a login is currently waiting for its callback.
    pub async fn is_armed(&self) -> bool {
        self.inner.lock().await.is_some()
    }
}

#[derive(Clone)]
struct CallbackState {
    slot: LoginSlot,
    exchanger: Arc<dyn TokenExchanger>,
}

/// Build the callback router serving `path`.
pub fn callback_router(path: &str, slot: LoginSlot, exchanger: Arc<dyn TokenExchanger>) -> Router {
    Router::new()
        .route(path, get(handle_callback))
        .layer(TraceLayer::new_for_http())
        .with_state(CallbackState { slot, exchanger })
}

type PageResponse = (StatusCode, Html<String>);

fn reject(reason: &str) -> PageResponse {
    (
        StatusCode::BAD_REQUEST,
        Html(error_html("Bad request", reason)),
    )
}

async fn handle_callback(
    State(state): State<CallbackState>,
    Query(params): Query<CallbackParams>,
) -> PageResponse {
    let mut guard = state.slot.inner.lock().await;

    let Some(mut pending) = guard.take() else {
        warn!("OAuth callback received with no login in progress");
        return reject("No login in progress");
    };

    let received = params.state.as_deref().unwrap_or_default();
    if !pending.session.state_matches(received) {
        warn!("OAuth state mismatch, ignoring callback");
        pending.saw_forged_state = true;
        *guard = Some(pending);
        return reject("Invalid state");
    }

    // The attempt is consumed from here on; release the slot before the
    // network round trip.
    drop(guard);

    if let Some(error) = params.error {
        let desc = params
            .error_description
            .unwrap_or_else(|| "Unknown error".to_string());
        warn!(error = %error, description = %desc, "OAuth error from provider");
        let _ = pending
            .reply
            .send(Err(AuthError::ProviderDenied(format!("{error}: {desc}"))));
        return (StatusCode::BAD_REQUEST, Html(error_html(&error, &desc)));
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        warn!("OAuth callback without authorization code");
        let _ = pending.reply.send(Err(AuthError::MissingCode));
        return reject("No code");
    };

    let result = state
        .exchanger
        .exchange(&code, &pending.session.code_verifier)
        .await;

    let page = match &result {
        Ok(_) => {
            info!("Cloudflare login completed");
            (StatusCode::OK, Html(success_html()))
        }
        Err(e) => {
            warn!(error = %e, "Token exchange failed");
            (
                StatusCode::BAD_GATEWAY,
                Html(error_html("exchange_failed", &e.to_string())),
            )
        }
    };

    if pending.reply.send(result).is_err() {
        warn!("Login flow stopped waiting before the token arrived");
    }

    page
}

// =============================================================================
// Listener lifecycle
// =============================================================================

/// Running callback server.
pub struct CallbackListener {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl CallbackListener {
    /// Bind `bind_addr` and start serving the callback route in the background.
    pub async fn start(
        bind_addr: &str,
        path: &str,
        slot: LoginSlot,
        exchanger: Arc<dyn TokenExchanger>,
    ) -> Result<Self, AuthError> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| AuthError::Listener {
                addr: bind_addr.to_string(),
                source,
            })?;
        let addr = listener.local_addr().map_err(|source| AuthError::Listener {
            addr: bind_addr.to_string(),
            source,
        })?;

        let app = callback_router(path, slot, exchanger);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!(addr = %addr, path, "OAuth callback listener started");

        Ok(Self {
            addr,
            shutdown: Some(shutdown_tx),
            handle,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop the server, waiting at most `timeout` for open connections to
    /// drain. Returns `false` when the server had to be aborted.
    pub async fn shutdown(mut self, timeout: Duration) -> bool {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        match tokio::time::timeout(timeout, &mut self.handle).await {
            Ok(Ok(Ok(()))) => {
                debug!("Callback listener stopped");
                true
            }
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "Callback listener exited with error");
                true
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Callback listener task failed");
                true
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "Callback listener forced to shut down");
                self.handle.abort();
                false
            }
        }
    }
}

// =============================================================================
// HTML Response Generation
// =============================================================================

/// Generate the confirmation page shown after a successful login.
pub fn success_html() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Cloudflare Login Successful</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            min-height: 100vh;
            margin: 0;
            background: #1b1b1f;
            color: #e0e0e0;
        }
        .container { text-align: center; padding: 2rem; max-width: 420px; }
        h1 { color: #f6821f; }
        p { color: #9ca3af; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Logged in to Cloudflare</h1>
        <p>BPB Wizard received your authorization.</p>
        <p>You can close this tab and return to the terminal.</p>
    </div>
</body>
</html>"#
        .to_string()
}

/// Generate an error page.
pub fn error_html(error: &str, description: &str) -> String {
    let error_code = html_escape(error);
    let desc = html_escape(description);
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Cloudflare Login Failed</title>
</head>
<body>
    <h1>Login failed</h1>
    <p><strong>Error:</strong> <code>{error_code}</code></p>
    <p>{desc}</p>
    <p>Return to the terminal for details.</p>
</body>
</html>"#
    )
}

/// Simple HTML escaping to prevent XSS.
fn html_escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
