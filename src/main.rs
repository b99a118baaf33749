//! bpb-wizard -- deploy the BPB proxy worker to Cloudflare.
//!
//! This is the application entry point. It wires together:
//!   - Configuration loading
//!   - The OAuth callback listener (skipped in API-token mode)
//!   - The interactive deployment run
//!   - Bounded listener shutdown, whatever the outcome

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use bpb_wizard::AppError;
use bpb_wizard::config::Config;
use bpb_wizard::oauth::SystemBrowser;
use bpb_wizard::prompt::{self, TerminalPrompter};
use bpb_wizard::wizard::{self, OAuthLogin};

// ---------------------------------------------------------------------------
// CLI argument parsing (minimal, no clap dependency)
// ---------------------------------------------------------------------------

struct CliArgs {
    config_path: PathBuf,
}

fn parse_args() -> CliArgs {
    let mut args = std::env::args().skip(1);
    let mut config_path = PathBuf::from("bpb-wizard.toml");

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                if let Some(path) = args.next() {
                    config_path = PathBuf::from(path);
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("bpb-wizard {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                eprintln!("Run with --help for usage information.");
                std::process::exit(1);
            }
        }
    }

    CliArgs { config_path }
}

fn print_usage() {
    println!(
        "\
bpb-wizard {version} -- Deploy the BPB proxy worker to Cloudflare

USAGE:
    bpb-wizard [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file [default: bpb-wizard.toml]
    -h, --help             Print this help message
    -V, --version          Print version information

ENVIRONMENT:
    RUST_LOG               Override log level (e.g. RUST_LOG=debug)
    BPB_CONFIG             Alternative to --config flag
    CLOUDFLARE_API_TOKEN   Skip the browser login and use this token
    CLOUDFLARE_ACCOUNT_ID  Deploy into this account instead of the first one
",
        version = env!("CARGO_PKG_VERSION")
    );
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime")
        .block_on(async_main());

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            prompt::status_err(&format!("{err:#}"));
            let code = err.downcast_ref::<AppError>().map_or(1, AppError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn async_main() -> anyhow::Result<()> {
    // 1. Parse CLI arguments
    let cli = parse_args();

    // Allow BPB_CONFIG env var as alternative to --config flag
    let config_path = std::env::var("BPB_CONFIG")
        .map(PathBuf::from)
        .unwrap_or(cli.config_path);

    // 2. Load configuration
    let config = Config::load(&config_path)?;

    // 3. Initialize tracing/logging
    init_tracing(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        overrides = config.env_overrides.all().len(),
        "Starting bpb-wizard"
    );
    for (setting, var) in config.env_overrides.all() {
        tracing::debug!(%setting, env = %var, "Setting overridden from environment");
    }

    prompt::header("  BPB Wizard - Cloudflare worker deployment");

    // 4. Shared HTTP client
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("bpb-wizard/", env!("CARGO_PKG_VERSION")))
        .build()?;

    // 5. Start the callback listener before any login is attempted
    let oauth = if config.uses_api_token() {
        tracing::info!("API token configured, skipping browser login");
        None
    } else {
        Some(
            OAuthLogin::start(&config.oauth, http.clone())
                .await
                .map_err(AppError::from)?,
        )
    };

    // 6. Run the deployment
    let prompter = TerminalPrompter::new();
    let outcome = wizard::run(
        &config,
        &http,
        oauth.as_ref(),
        Arc::new(SystemBrowser),
        &prompter,
    )
    .await;

    // 7. Stop the listener whether or not the run succeeded
    if let Some(login) = oauth {
        if !login.shutdown().await {
            tracing::warn!("Callback listener did not stop in time");
        }
    }

    let report = outcome?;
    println!("\n--- Deployment Successful! ---");
    println!("{report}");

    Ok(())
}

// ---------------------------------------------------------------------------
// Tracing initialization
// ---------------------------------------------------------------------------

fn init_tracing(config: &Config) {
    // RUST_LOG env var takes precedence over config file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("bpb_wizard={level},tower_http={level},warn"))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
