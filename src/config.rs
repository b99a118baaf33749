use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Environment override tracking
// ---------------------------------------------------------------------------

/// Tracks which configuration settings are overridden by environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    overrides: HashMap<String, String>,
}

impl EnvOverrides {
    /// Get all overrides as a map of setting key -> env var name.
    pub fn all(&self) -> &HashMap<String, String> {
        &self.overrides
    }

    fn record(&mut self, key: &str, env_var: &str) {
        self.overrides.insert(key.to_string(), env_var.to_string());
    }
}

// ---------------------------------------------------------------------------
// Main configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub cloudflare: CloudflareConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Env var overrides are not serialized to TOML.
    #[serde(skip)]
    pub env_overrides: EnvOverrides,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OAuthConfig {
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Host used in the redirect URL registered with the provider.
    #[serde(default = "default_callback_host")]
    pub callback_host: String,
    /// Local interface the callback listener binds to.
    #[serde(default = "default_callback_bind")]
    pub callback_bind: String,
    #[serde(default = "default_callback_port")]
    pub callback_port: u16,
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
    #[serde(default = "default_login_timeout_secs")]
    pub login_timeout_secs: u64,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            callback_host: default_callback_host(),
            callback_bind: default_callback_bind(),
            callback_port: default_callback_port(),
            callback_path: default_callback_path(),
            login_timeout_secs: default_login_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl OAuthConfig {
    /// Redirect target handed to the provider.
    pub fn redirect_uri(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.callback_host, self.callback_port, self.callback_path
        )
    }

    /// Socket address the callback listener binds.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.callback_bind, self.callback_port)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CloudflareConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// API token; when set the browser login is skipped.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    /// Pin the account instead of using the first one the token can see.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

impl Default for CloudflareConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_token: None,
            account_id: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkerConfig {
    #[serde(default = "default_bundle_url")]
    pub bundle_url: String,
    /// Local bundle used instead of downloading `bundle_url`.
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_path: Option<PathBuf>,
    #[serde(default = "default_main_module")]
    pub main_module: String,
    #[serde(default = "default_compatibility_flags")]
    pub compatibility_flags: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            bundle_url: default_bundle_url(),
            bundle_path: None,
            main_module: default_main_module(),
            compatibility_flags: default_compatibility_flags(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_client_id() -> String {
    "54d11594-84e4-41aa-b438-e81b8fa78ee7".to_string()
}
fn default_auth_url() -> String {
    "https://dash.cloudflare.com/oauth2/auth".to_string()
}
fn default_token_url() -> String {
    "https://dash.cloudflare.com/oauth2/token".to_string()
}
fn default_callback_host() -> String {
    "localhost".to_string()
}
fn default_callback_bind() -> String {
    "127.0.0.1".to_string()
}
const fn default_callback_port() -> u16 {
    8976
}
fn default_callback_path() -> String {
    "/oauth/callback".to_string()
}
const fn default_login_timeout_secs() -> u64 {
    300
}
const fn default_shutdown_timeout_secs() -> u64 {
    5
}
fn default_api_base() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}
fn default_bundle_url() -> String {
    "https://raw.githubusercontent.com/yas-python/zizifn/main/_worker.js".to_string()
}
fn default_main_module() -> String {
    "worker.js".to_string()
}
fn default_compatibility_flags() -> Vec<String> {
    vec!["nodejs_compat".to_string()]
}
fn default_log_level() -> String {
    "info".to_string()
}

// ---------------------------------------------------------------------------
// Config loading and env overrides
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a TOML file, then apply environment variable
    /// overrides. Overridden settings are tracked in `env_overrides`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            config
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Whether an API token was supplied, making the browser login unnecessary.
    pub fn uses_api_token(&self) -> bool {
        self.cloudflare
            .api_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }

    fn apply_env_overrides(&mut self) {
        let mut ov = EnvOverrides::default();

        macro_rules! env_str {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = val;
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_bool {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
                    ov.record($key, $env);
                }
            };
        }
        macro_rules! env_parse {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    if let Ok(parsed) = val.parse() {
                        $field = parsed;
                        ov.record($key, $env);
                    }
                }
            };
        }
        macro_rules! env_opt_str {
            ($key:expr, $env:expr, $field:expr) => {
                if let Ok(val) = std::env::var($env) {
                    $field = if val.is_empty() { None } else { Some(val) };
                    ov.record($key, $env);
                }
            };
        }

        // -- OAuth --
        env_str!("oauth.client_id", "BPB_OAUTH_CLIENT_ID", self.oauth.client_id);
        env_str!("oauth.auth_url", "BPB_OAUTH_AUTH_URL", self.oauth.auth_url);
        env_str!("oauth.token_url", "BPB_OAUTH_TOKEN_URL", self.oauth.token_url);
        env_parse!("oauth.callback_port", "BPB_OAUTH_CALLBACK_PORT", self.oauth.callback_port);
        env_parse!(
            "oauth.login_timeout_secs",
            "BPB_OAUTH_LOGIN_TIMEOUT_SECS",
            self.oauth.login_timeout_secs
        );

        // -- Cloudflare --
        env_str!("cloudflare.api_base", "BPB_CLOUDFLARE_API_BASE", self.cloudflare.api_base);
        env_opt_str!("cloudflare.api_token", "CLOUDFLARE_API_TOKEN", self.cloudflare.api_token);
        env_opt_str!("cloudflare.account_id", "CLOUDFLARE_ACCOUNT_ID", self.cloudflare.account_id);

        // -- Worker --
        env_str!("worker.bundle_url", "BPB_WORKER_BUNDLE_URL", self.worker.bundle_url);
        if let Ok(val) = std::env::var("BPB_WORKER_BUNDLE_PATH") {
            self.worker.bundle_path = if val.is_empty() { None } else { Some(PathBuf::from(val)) };
            ov.record("worker.bundle_path", "BPB_WORKER_BUNDLE_PATH");
        }

        // -- Logging --
        env_str!("logging.level", "BPB_LOG_LEVEL", self.logging.level);
        env_bool!("logging.json", "BPB_LOG_JSON", self.logging.json);

        self.env_overrides = ov;
    }
}
