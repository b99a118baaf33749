use std::fmt;

/// Schema the worker expects in its D1 database.
const USERS_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS users (uuid TEXT PRIMARY KEY, created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP, expiration_date TEXT NOT NULL, expiration_time TEXT NOT NULL, notes TEXT, data_limit INTEGER DEFAULT 0, data_usage INTEGER DEFAULT 0, ip_limit INTEGER DEFAULT 2);";

/// What the operator sees after a successful deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentReport {
    pub panel_url: String,
    pub database_name: String,
    pub warnings: Vec<String>,
}

impl DeploymentReport {
    /// Admin panel under `host`.
    pub fn panel_url_for(host: &str) -> String {
        format!("https://{host}/admin")
    }

    pub fn d1_init_command(&self) -> String {
        format!(
            "wrangler d1 execute {} --command=\"{USERS_TABLE_SQL}\"",
            self.database_name
        )
    }
}

impl fmt::Display for DeploymentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for warning in &self.warnings {
            writeln!(f, "Warning: {warning}")?;
        }
        writeln!(f, "Admin Panel URL: {}", self.panel_url)?;
        writeln!(f, "Please wait a minute for all changes to propagate.")?;
        writeln!(
            f,
            "Initialise the database with wrangler on your local machine:"
        )?;
        write!(f, "  {}", self.d1_init_command())
    }
}
