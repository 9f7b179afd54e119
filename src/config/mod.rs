//! Configuration module for the TagTalk backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default Stripe REST endpoint.
pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file backing the document store
    pub db_path: PathBuf,
    /// Secret used to sign bearer tokens (random per process when unset)
    pub token_secret: Option<String>,
    /// Payment processor secret key; payments are disabled without it
    pub stripe_secret_key: Option<String>,
    /// Base URL of the payment processor API
    pub stripe_api_base: String,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("TAGTALK_DB_PATH")
            .unwrap_or_else(|_| "./data/tagtalk.sqlite".to_string())
            .into();

        let token_secret = env::var("TAGTALK_TOKEN_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        let stripe_secret_key = env::var("TAGTALK_STRIPE_SECRET_KEY")
            .ok()
            .filter(|s| !s.is_empty());

        let stripe_api_base = env::var("TAGTALK_STRIPE_API_BASE")
            .unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string());

        let bind_addr = env::var("TAGTALK_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:5000".to_string())
            .parse()
            .expect("Invalid TAGTALK_BIND_ADDR format");

        let log_level = env::var("TAGTALK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Self {
            db_path,
            token_secret,
            stripe_secret_key,
            stripe_api_base,
            bind_addr,
            log_level,
        }
    }
}
