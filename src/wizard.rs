//! End-to-end deployment: credentials, account, operator input, provisioning.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::bundle::fetch_bundle;
use crate::cloudflare::{CloudApi, CloudClient, resolve_account};
use crate::config::{Config, OAuthConfig};
use crate::deploy::{
    DeployContext, DeploymentReport, DeploymentSpec, NameAvailability, Provisioned,
    ResourceProvisioner, today_compatibility_date,
};
use crate::error::AppError;
use crate::oauth::{
    AuthError, AuthFlow, CallbackListener, HttpTokenExchanger, LoginSlot, OAuthSettings,
    ObtainedToken, UrlOpener,
};
use crate::prompt::{self, Prompter, collect_spec};

/// A running callback listener and the settings to log in through it.
///
/// Started before the login is attempted; shut down once the whole run ends.
pub struct OAuthLogin {
    settings: OAuthSettings,
    slot: LoginSlot,
    listener: CallbackListener,
    login_timeout: Duration,
    shutdown_timeout: Duration,
}

impl OAuthLogin {
    pub async fn start(config: &OAuthConfig, http: reqwest::Client) -> Result<Self, AuthError> {
        let settings = OAuthSettings::from_config(config);
        let slot = LoginSlot::new();
        let exchanger = Arc::new(HttpTokenExchanger::new(http, settings.clone()));
        let listener = CallbackListener::start(
            &config.bind_addr(),
            &config.callback_path,
            slot.clone(),
            exchanger,
        )
        .await?;

        Ok(Self {
            settings,
            slot,
            listener,
            login_timeout: Duration::from_secs(config.login_timeout_secs),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        })
    }

    pub async fn login(&self, opener: Arc<dyn UrlOpener>) -> Result<ObtainedToken, AuthError> {
        AuthFlow::new(
            self.settings.clone(),
            self.slot.clone(),
            opener,
            self.login_timeout,
        )
        .login()
        .await
    }

    /// Stop the listener within the configured shutdown timeout.
    pub async fn shutdown(self) -> bool {
        self.listener.shutdown(self.shutdown_timeout).await
    }
}

/// Check the name, then provision everything for `spec`.
///
/// A taken name stops the run before anything is created. An inconclusive
/// lookup continues only if the operator confirms.
#[instrument(skip_all, fields(worker = %spec.name()))]
pub async fn deploy(
    ctx: &DeployContext,
    spec: &DeploymentSpec,
    prompter: &dyn Prompter,
) -> Result<Provisioned, AppError> {
    match NameAvailability::check(ctx.api.as_ref(), &ctx.account, spec.name()).await {
        NameAvailability::Available => {
            info!("Worker name is available");
        }
        NameAvailability::Taken => {
            return Err(AppError::NameTaken(spec.name().to_string()));
        }
        NameAvailability::Inconclusive(reason) => {
            prompt::status_err(&format!(
                "Could not confirm that '{}' is free: {reason}",
                spec.name()
            ));
            let proceed = prompter
                .confirm("Continue anyway? An existing worker would be overwritten", false)
                .map_err(|e| AppError::Cancelled(e.to_string()))?;
            if !proceed {
                return Err(AppError::Cancelled(format!(
                    "availability of '{}' unknown",
                    spec.name()
                )));
            }
            warn!("Continuing despite inconclusive name lookup");
        }
    }

    Ok(ResourceProvisioner::new(ctx, prompter).run(spec).await?)
}

/// Obtain a credential, then run the interactive deployment.
///
/// `oauth` is `None` in API-token mode.
pub async fn run(
    config: &Config,
    http: &reqwest::Client,
    oauth: Option<&OAuthLogin>,
    opener: Arc<dyn UrlOpener>,
    prompter: &dyn Prompter,
) -> Result<DeploymentReport, AppError> {
    let token = match (oauth, config.cloudflare.api_token.as_deref()) {
        (Some(login), _) => login.login(opener).await?.access_token,
        (None, Some(token)) => {
            info!("Using API token from configuration");
            token.trim().to_string()
        }
        (None, None) => {
            return Err(AppError::NoCredential);
        }
    };
    prompt::status_ok("Authenticated with Cloudflare");

    let api: Arc<dyn CloudApi> = Arc::new(CloudClient::new(
        http.clone(),
        config.cloudflare.api_base.clone(),
        token,
    ));
    let account = resolve_account(api.as_ref(), config.cloudflare.account_id.as_deref()).await?;
    info!(account_id = %account.id, account = %account.name, "Using Cloudflare account");

    let spec = collect_spec(prompter)?;
    let bundle = fetch_bundle(http, &config.worker).await?;

    let ctx = DeployContext {
        api,
        account,
        bundle_path: bundle.path().to_path_buf(),
        main_module: config.worker.main_module.clone(),
        compatibility_date: today_compatibility_date(),
        compatibility_flags: config.worker.compatibility_flags.clone(),
    };

    println!("\nStarting deployment process...");
    let provisioned = deploy(&ctx, &spec, prompter).await?;
    drop(bundle);

    Ok(provisioned.report)
}
