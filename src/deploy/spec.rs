use super::error::ValidationError;

/// Longest script name the platform accepts.
const MAX_NAME_LEN: usize = 63;

/// What the operator asked to deploy.
///
/// Built only through [`DeploymentSpec::new`], so the mandatory fields are
/// always present and optional ones are `None` rather than empty.
#[derive(Clone, PartialEq, Eq)]
pub struct DeploymentSpec {
    name: String,
    admin_key: String,
    proxy_ip: String,
    root_proxy_url: Option<String>,
    custom_domain: Option<String>,
}

impl std::fmt::Debug for DeploymentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeploymentSpec")
            .field("name", &self.name)
            .field("admin_key", &"[REDACTED]")
            .field("proxy_ip", &self.proxy_ip)
            .field("root_proxy_url", &self.root_proxy_url)
            .field("custom_domain", &self.custom_domain)
            .finish()
    }
}

impl DeploymentSpec {
    pub fn new(
        name: &str,
        admin_key: &str,
        proxy_ip: &str,
        root_proxy_url: &str,
        custom_domain: &str,
    ) -> Result<Self, ValidationError> {
        let name = required("worker name", name)?;
        validate_name(&name)?;

        Ok(Self {
            name,
            admin_key: required("admin key", admin_key)?,
            proxy_ip: required("proxy IP", proxy_ip)?,
            root_proxy_url: optional(root_proxy_url),
            custom_domain: optional(custom_domain).map(|d| d.trim_end_matches('.').to_lowercase()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn admin_key(&self) -> &str {
        &self.admin_key
    }

    pub fn proxy_ip(&self) -> &str {
        &self.proxy_ip
    }

    pub fn root_proxy_url(&self) -> Option<&str> {
        self.root_proxy_url.as_deref()
    }

    pub fn custom_domain(&self) -> Option<&str> {
        self.custom_domain.as_deref()
    }

    pub fn kv_namespace_title(&self) -> String {
        format!("USER_KV_{}", self.name)
    }

    pub fn database_name(&self) -> String {
        format!("DB_{}", self.name)
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(value.to_string())
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::InvalidField {
            field: "worker name",
            reason: format!("longer than {MAX_NAME_LEN} characters"),
        });
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '_'))
    {
        return Err(ValidationError::InvalidField {
            field: "worker name",
            reason: format!("'{c}' is not allowed; use lowercase letters, digits, '-' or '_'"),
        });
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(ValidationError::InvalidField {
            field: "worker name",
            reason: "must not start or end with '-'".to_string(),
        });
    }
    Ok(())
}
