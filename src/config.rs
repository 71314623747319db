// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development. Every setting has a
//! default, so an empty environment yields a usable configuration pointing
//! at a local backend.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// What to do when a token refresh fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshFailurePolicy {
    /// Keep the stale token; the next 401 gets another chance to refresh.
    #[default]
    KeepSession,
    /// Drop the session as soon as a refresh attempt fails.
    Logout,
}

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL, including the `/api/v1` prefix
    pub api_base_url: String,
    /// Refresh this many seconds before the token expires
    pub refresh_margin_secs: i64,
    /// Token lifetime assumed when the backend does not send one
    pub default_expires_in_secs: i64,
    /// Retries allowed per failure category (401 and transient)
    pub max_retries: u32,
    /// Backoff unit; retry `n` waits `n * backoff_base`
    pub backoff_base: Duration,
    /// Optional per-request transport timeout
    pub request_timeout: Option<Duration>,
    /// Behavior on refresh failure
    pub refresh_failure_policy: RefreshFailurePolicy,
    /// Directory for file-backed session storage (driver binary only)
    pub session_dir: Option<PathBuf>,
}

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 300;
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 1800;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1000;

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            refresh_margin_secs: DEFAULT_REFRESH_MARGIN_SECS,
            default_expires_in_secs: DEFAULT_EXPIRES_IN_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
            request_timeout: None,
            refresh_failure_policy: RefreshFailurePolicy::KeepSession,
            session_dir: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let logout_on_failure: bool = parse_var("STREAMVOICE_LOGOUT_ON_REFRESH_FAILURE")?
            .unwrap_or(false);

        Ok(Self {
            api_base_url: env::var("STREAMVOICE_API_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            refresh_margin_secs: parse_var("STREAMVOICE_REFRESH_MARGIN_SECS")?
                .unwrap_or(DEFAULT_REFRESH_MARGIN_SECS),
            default_expires_in_secs: parse_var("STREAMVOICE_DEFAULT_EXPIRES_IN_SECS")?
                .unwrap_or(DEFAULT_EXPIRES_IN_SECS),
            max_retries: parse_var("STREAMVOICE_MAX_RETRIES")?.unwrap_or(DEFAULT_MAX_RETRIES),
            backoff_base: Duration::from_millis(
                parse_var("STREAMVOICE_BACKOFF_BASE_MS")?.unwrap_or(DEFAULT_BACKOFF_BASE_MS),
            ),
            request_timeout: parse_var::<u64>("STREAMVOICE_REQUEST_TIMEOUT_SECS")?
                .map(Duration::from_secs),
            refresh_failure_policy: if logout_on_failure {
                RefreshFailurePolicy::Logout
            } else {
                RefreshFailurePolicy::KeepSession
            },
            session_dir: env::var("STREAMVOICE_SESSION_DIR").ok().map(PathBuf::from),
        })
    }

    /// Build an absolute URL for an API path such as `auth/login`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        _ => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
