use tracing::{instrument, warn};

use crate::cloudflare::{CloudAccount, CloudApi};

/// Whether a script name is free in the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameAvailability {
    /// Lookup returned not-found.
    Available,
    /// A script with this name already exists.
    Taken,
    /// Lookup failed for another reason; availability is unknown.
    Inconclusive(String),
}

impl NameAvailability {
    #[instrument(skip(api, account))]
    pub async fn check(api: &dyn CloudApi, account: &CloudAccount, name: &str) -> Self {
        match api.script_exists(&account.id, name).await {
            Ok(true) => Self::Taken,
            Ok(false) => Self::Available,
            Err(e) => {
                warn!(error = %e, "Script name lookup failed");
                Self::Inconclusive(e.to_string())
            }
        }
    }
}
