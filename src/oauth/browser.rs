//! Opening the authorization URL in the operator's browser.

use std::process::{Command, Stdio};

/// Capability to hand a URL to something that can display it.
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Launches the platform's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        let mut command = if cfg!(target_os = "windows") {
            let mut c = Command::new("rundll32");
            c.arg("url.dll,FileProtocolHandler");
            c
        } else if cfg!(target_os = "macos") {
            Command::new("open")
        } else if std::env::var_os("TERMUX_VERSION").is_some() {
            Command::new("termux-open-url")
        } else {
            Command::new("xdg-open")
        };

        command
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
    }
}
