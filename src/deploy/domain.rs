//! Custom hostname attachment.

use tracing::{info, instrument};

use crate::cloudflare::{CloudAccount, CloudApi, DomainAttachment, Zone};

use super::error::DomainError;

/// Environment every hostname is attached under.
pub const PRODUCTION_ENVIRONMENT: &str = "production";

/// Outcome of a successful attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainBinding {
    pub registrable_domain: String,
    pub zone: Zone,
    pub hostname: String,
}

/// The registrable domain of `hostname`: the public suffix plus one label.
///
/// Uses the public suffix list compiled into the `addr` crate.
pub fn registrable_domain(hostname: &str) -> Result<String, DomainError> {
    let host = hostname.trim().trim_end_matches('.').to_lowercase();
    let name = addr::parse_domain_name(&host)
        .map_err(|_| DomainError::InvalidHostname(hostname.to_string()))?;
    name.root()
        .map(str::to_string)
        .ok_or_else(|| DomainError::InvalidHostname(hostname.to_string()))
}

/// Resolves a hostname to its zone and attaches it to a script.
pub struct DomainBinder<'a> {
    api: &'a dyn CloudApi,
    account: &'a CloudAccount,
}

impl<'a> DomainBinder<'a> {
    pub fn new(api: &'a dyn CloudApi, account: &'a CloudAccount) -> Self {
        Self { api, account }
    }

    /// Find the zone whose name equals the registrable domain of `hostname`.
    pub async fn find_zone(&self, hostname: &str) -> Result<(String, Zone), DomainError> {
        let domain = registrable_domain(hostname)?;
        let zones = self.api.list_zones(&self.account.id, &domain).await?;
        let zone = zones
            .into_iter()
            .find(|z| z.name.eq_ignore_ascii_case(&domain))
            .ok_or_else(|| DomainError::NoZone(domain.clone()))?;
        Ok((domain, zone))
    }

    #[instrument(skip(self))]
    pub async fn bind(&self, script: &str, hostname: &str) -> Result<DomainBinding, DomainError> {
        let (registrable_domain, zone) = self.find_zone(hostname).await?;
        info!(zone_id = %zone.id, zone = %zone.name, "Found zone for custom domain");

        let attachment = DomainAttachment {
            environment: PRODUCTION_ENVIRONMENT.to_string(),
            hostname: hostname.to_string(),
            service: script.to_string(),
            zone_id: zone.id.clone(),
        };
        let attached = self.api.attach_domain(&self.account.id, &attachment).await?;
        info!(hostname = %attached.hostname, "Custom domain attached");

        Ok(DomainBinding {
            registrable_domain,
            zone,
            hostname: attached.hostname,
        })
    }
}
