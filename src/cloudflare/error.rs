use super::types::ApiMessage;

/// Errors returned by the REST client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cloudflare API error (HTTP {status}): {}", join_messages(.errors))]
    Api { status: u16, errors: Vec<ApiMessage> },

    #[error("Failed to decode Cloudflare response: {0}")]
    Decode(String),

    #[error("Cloudflare response for {0} carried no result")]
    MissingResult(&'static str),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether any provider error message contains `needle` (case-insensitive).
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        match self {
            Self::Api { errors, .. } => errors
                .iter()
                .any(|e| e.message.to_lowercase().contains(&needle)),
            other => other.to_string().to_lowercase().contains(&needle),
        }
    }
}

fn join_messages(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| format!("[{}] {}", e.code, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}
