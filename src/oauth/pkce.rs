//! PKCE (Proof Key for Code Exchange) session material.
//!
//! A fresh [`AuthSession`] is minted for every login attempt:
//! - `state`: 16-character anti-forgery token echoed back by the provider
//! - `code_verifier`: 32 random bytes, base64url encoded without padding
//! - `code_challenge`: S256 transform of the verifier

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// PKCE challenge method constant.
pub const PKCE_METHOD: &str = "S256";

/// Alphabet used for the state token.
const STATE_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// State token length in characters.
const STATE_LENGTH: usize = 16;

/// Number of random bytes behind the code verifier.
const VERIFIER_BYTES: usize = 32;

/// Per-attempt PKCE and state material.
///
/// The challenge is derived once in [`AuthSession::generate`] and never
/// recomputed while the flow is running.
#[derive(Clone)]
pub struct AuthSession {
    /// Anti-forgery token compared verbatim against the callback `state`.
    pub state: String,

    /// The code verifier (secret, sent only to the token endpoint).
    pub code_verifier: String,

    /// SHA-256 of the verifier, base64url encoded without padding.
    pub code_challenge: String,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("state", &self.state)
            .field("code_verifier", &"<redacted>")
            .field("code_challenge", &self.code_challenge)
            .finish()
    }
}

impl AuthSession {
    /// Generate a new session with fresh state and verifier.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();

        let state: String = (0..STATE_LENGTH)
            .map(|_| STATE_CHARS[rng.random_range(0..STATE_CHARS.len())] as char)
            .collect();

        let mut raw = [0u8; VERIFIER_BYTES];
        rng.fill(&mut raw[..]);
        let code_verifier = URL_SAFE_NO_PAD.encode(raw);

        let code_challenge = compute_challenge(&code_verifier);

        Self {
            state,
            code_verifier,
            code_challenge,
        }
    }

    /// Challenge method sent alongside the challenge.
    pub fn method(&self) -> &'static str {
        PKCE_METHOD
    }

    /// Whether `candidate` is exactly the state this session issued.
    pub fn state_matches(&self, candidate: &str) -> bool {
        self.state == candidate
    }
}

/// Compute the S256 challenge from a verifier.
pub fn compute_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
