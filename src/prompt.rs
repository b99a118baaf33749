//! Operator prompts.
//!
//! Uses dialoguer for terminal UI prompts. The [`Prompter`] trait lets the
//! pipeline ask for retry decisions without touching a real terminal in tests.

use std::io;

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password};

use crate::deploy::{DeploymentSpec, ValidationError};

/// Source of operator answers.
pub trait Prompter: Send + Sync {
    /// Free-text answer. `allow_empty` permits pressing Enter to skip.
    fn input(&self, prompt: &str, allow_empty: bool) -> io::Result<String>;

    /// Answer that should not be echoed.
    fn secret(&self, prompt: &str) -> io::Result<String>;

    fn confirm(&self, prompt: &str, default: bool) -> io::Result<bool>;
}

/// Interactive prompts on the controlling terminal.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn input(&self, prompt: &str, allow_empty: bool) -> io::Result<String> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(allow_empty)
            .interact_text()
            .map_err(io::Error::other)
    }

    fn secret(&self, prompt: &str) -> io::Result<String> {
        Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(io::Error::other)
    }

    fn confirm(&self, prompt: &str, default: bool) -> io::Result<bool> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(io::Error::other)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("Failed to read operator answer: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Ask for every deployment field, then validate.
///
/// Mandatory fields may be answered empty here; [`DeploymentSpec::new`]
/// rejects them before anything touches the network.
pub fn collect_spec(prompter: &dyn Prompter) -> Result<DeploymentSpec, CollectError> {
    let name = prompter.input("Enter a name for your new worker", true)?;
    let admin_key = prompter.secret("Enter the admin panel password (ADMIN_KEY)")?;
    let proxy_ip = prompter.input("Enter a clean IP/domain for configs (PROXYIP)", true)?;
    let root_proxy_url = prompter.input(
        "Enter a URL to proxy at root '/' (optional, press Enter to skip)",
        true,
    )?;
    let custom_domain = prompter.input(
        "Enter a custom domain (optional, press Enter to use workers.dev)",
        true,
    )?;

    Ok(DeploymentSpec::new(
        &name,
        &admin_key,
        &proxy_ip,
        &root_proxy_url,
        &custom_domain,
    )?)
}

/// Print a completed-step line.
pub fn status_ok(message: &str) {
    println!("{} {message}", style("✔").green().bold());
}

/// Print a failed-step line to stderr.
pub fn status_err(message: &str) {
    eprintln!("{} {message}", style("✘").red().bold());
}

pub fn header(title: &str) {
    println!();
    println!("{}", style(title).bold().cyan());
    println!();
}
