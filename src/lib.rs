//! bpb-wizard: interactive deployer for the BPB proxy worker on Cloudflare.
//!
//! Logs in with OAuth 2.0 + PKCE (or an API token), provisions a KV namespace
//! and a D1 database, uploads the worker with its bindings, enables the
//! `workers.dev` route and optionally attaches a custom domain.

pub mod bundle;
pub mod cloudflare;
pub mod config;
pub mod deploy;
pub mod error;
pub mod oauth;
pub mod prompt;
pub mod wizard;

pub use error::AppError;
