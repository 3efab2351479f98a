//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible
//! defaults for development. In production, configure via environment
//! variables or a `.env` file.
//!
//! # Security Configuration
//!
//! - `TRUST_PROXY_HEADERS`: Trust `X-Forwarded-For` / `X-Real-IP` for client
//!   identity (default: false). Enable only behind a trusted reverse proxy.
//! - `MAX_REQUEST_BODY_BYTES`: Request body cap in bytes (default: 65536,
//!   clamped to at least 1024)
//! - `CSP_REPORT_ONLY`: Emit the Content-Security-Policy header in
//!   report-only mode (default: true)
//! - `CORS_ORIGINS`: Comma-separated list of additional allowed origins
//!
//! # Rate Limit Configuration
//!
//! Each rate-limited route has its own variable holding comma-separated
//! `count/window` rules, e.g. `RATE_LIMIT_GENERATE=5/minute,30/hour`. All
//! rules for a route must pass for a request to be admitted.

use std::collections::HashMap;
use std::env;

use crate::error::{AppError, AppResult};
use crate::limiter::{LimitRule, parse_rules};
use crate::routes::{FEEDBACK_EDIT_PATH, FEEDBACK_THUMB_PATH, GENERATE_PATH};

/// Smallest accepted body cap. Values below this are clamped up so a
/// misconfigured deployment cannot reject every JSON payload.
pub const MIN_REQUEST_BODY_BYTES: usize = 1024;

const DEFAULT_GENERATE_RULES: &str = "5/minute,30/hour";
const DEFAULT_FEEDBACK_THUMB_RULES: &str = "30/minute,300/hour";
const DEFAULT_FEEDBACK_EDIT_RULES: &str = "15/minute,120/hour";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 8000)
    pub port: u16,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Trust forwarded headers when resolving client identity.
    ///
    /// When false (the default), the TCP peer address is the identity and
    /// forwarded headers are ignored. Enable only when every request passes
    /// through a proxy that overwrites these headers.
    pub trust_proxy_headers: bool,

    /// Maximum request body size in bytes (default: 64 KiB).
    /// Declared and actual body sizes above this are rejected with 413.
    pub max_request_body_bytes: usize,

    /// Emit Content-Security-Policy in report-only mode (default: true)
    pub csp_report_only: bool,

    /// Additional allowed CORS origins beyond the local dev frontend
    pub cors_origins: Vec<String>,

    // =========================================================================
    // Rate Limiting Configuration
    // =========================================================================
    /// Rules for `POST /generate_response` (default: "5/minute,30/hour")
    pub rate_limit_generate: Vec<LimitRule>,

    /// Rules for `POST /feedback/thumb` (default: "30/minute,300/hour")
    pub rate_limit_feedback_thumb: Vec<LimitRule>,

    /// Rules for `POST /feedback/edit` (default: "15/minute,120/hour")
    pub rate_limit_feedback_edit: Vec<LimitRule>,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any value fails to parse (e.g.
    /// non-numeric `PORT`, malformed rate limit rules).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 8000)?,

            // Security
            trust_proxy_headers: Self::parse_bool_env("TRUST_PROXY_HEADERS", false),
            max_request_body_bytes: Self::parse_env("MAX_REQUEST_BODY_BYTES", 64 * 1024)?
                .max(MIN_REQUEST_BODY_BYTES),
            csp_report_only: Self::parse_bool_env("CSP_REPORT_ONLY", true),
            cors_origins: Self::parse_cors_origins(),

            // Rate limiting
            rate_limit_generate: Self::parse_rules_env(
                "RATE_LIMIT_GENERATE",
                DEFAULT_GENERATE_RULES,
            )?,
            rate_limit_feedback_thumb: Self::parse_rules_env(
                "RATE_LIMIT_FEEDBACK_THUMB",
                DEFAULT_FEEDBACK_THUMB_RULES,
            )?,
            rate_limit_feedback_edit: Self::parse_rules_env(
                "RATE_LIMIT_FEEDBACK_EDIT",
                DEFAULT_FEEDBACK_EDIT_RULES,
            )?,

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    fn validate(&self) -> AppResult<()> {
        if self.rate_limit_generate.is_empty() {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_GENERATE must contain at least one rule".to_string(),
            ));
        }
        if self.rate_limit_feedback_thumb.is_empty() {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_FEEDBACK_THUMB must contain at least one rule".to_string(),
            ));
        }
        if self.rate_limit_feedback_edit.is_empty() {
            return Err(AppError::ConfigError(
                "RATE_LIMIT_FEEDBACK_EDIT must contain at least one rule".to_string(),
            ));
        }

        Ok(())
    }

    /// The per-route admission policy consumed by the rate limiter.
    pub fn policy(&self) -> HashMap<String, Vec<LimitRule>> {
        HashMap::from([
            (GENERATE_PATH.to_string(), self.rate_limit_generate.clone()),
            (
                FEEDBACK_THUMB_PATH.to_string(),
                self.rate_limit_feedback_thumb.clone(),
            ),
            (
                FEEDBACK_EDIT_PATH.to_string(),
                self.rate_limit_feedback_edit.clone(),
            ),
        ])
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr + ToString,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse a boolean environment variable, accepting 1/true/yes/on.
    fn parse_bool_env(name: &str, default: bool) -> bool {
        match env::var(name) {
            Ok(val) => parse_bool(&val),
            Err(_) => default,
        }
    }

    /// Parse a rate limit rule list from an environment variable.
    fn parse_rules_env(name: &str, default: &str) -> AppResult<Vec<LimitRule>> {
        let raw = env::var(name).unwrap_or_else(|_| default.to_string());
        parse_rules(&raw).map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}")))
    }

    /// Parse CORS origins from environment variable.
    ///
    /// The local dev frontend origin is always included.
    fn parse_cors_origins() -> Vec<String> {
        let mut origins = vec!["http://localhost:3000".to_string()];
        if let Ok(raw) = env::var("CORS_ORIGINS") {
            for origin in raw.split(',') {
                let origin = origin.trim();
                if !origin.is_empty() && !origins.iter().any(|o| o == origin) {
                    origins.push(origin.to_string());
                }
            }
        }
        origins
    }
}

/// Truthy string values: "1", "true", "yes", "on" (case-insensitive).
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        #[allow(clippy::expect_used)]
        fn rules(raw: &str) -> Vec<LimitRule> {
            parse_rules(raw).expect("default rules are well-formed")
        }

        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 8000,
            // Security
            trust_proxy_headers: false,
            max_request_body_bytes: 64 * 1024,
            csp_report_only: true,
            cors_origins: vec!["http://localhost:3000".to_string()],
            // Rate limiting
            rate_limit_generate: rules(DEFAULT_GENERATE_RULES),
            rate_limit_feedback_thumb: rules(DEFAULT_FEEDBACK_THUMB_RULES),
            rate_limit_feedback_edit: rules(DEFAULT_FEEDBACK_EDIT_RULES),
            // Observability
            log_level: "info".to_string(),
            metrics_port: 9090,
        }
    }
}
