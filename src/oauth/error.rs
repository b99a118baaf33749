//! Error types for the login handshake.

/// Errors that can occur while obtaining an access token.
///
/// Every variant is fatal to the current login attempt; none are retried
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The deadline passed and the only callbacks that arrived carried a
    /// `state` other than the one we issued (possible CSRF or a stale tab).
    #[error("Invalid OAuth state")]
    StateMismatch,

    /// The redirect carried no authorization code.
    #[error("No authorization code returned")]
    MissingCode,

    /// The provider redirected back with an explicit error.
    #[error("Authorization denied: {0}")]
    ProviderDenied(String),

    /// Token exchange failed (network error, rejected code, reused code).
    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    /// No token was delivered before the login deadline.
    #[error("Timed out after {0}s waiting for the OAuth callback")]
    Timeout(u64),

    /// The callback side went away without delivering anything.
    #[error("OAuth callback listener stopped before delivering a token")]
    HandoffDropped,

    /// The local callback listener could not be started.
    #[error("Failed to start callback listener on {addr}: {source}")]
    Listener {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
