/*!
 * Copyright (c) 2026 Ming Lyu, aka mingcheng
 *
 * This source code is licensed under the MIT License,
 * which is located in the LICENSE file in the source tree's root directory.
 *
 * File: config.rs
 * Author: mingcheng <mingcheng@apache.org>
 * File Created: 2026-02-12 15:38:23
 *
 * Modified By: mingcheng <mingcheng@apache.org>
 * Last Modified: 2026-03-04 11:20:58
 */

use crate::retry::RetryPolicy;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub transport: TransportConfig,
    #[serde(default)]
    pub retry: RetryPolicy,
    pub default_sender: Option<String>,
    pub log_file: Option<String>,
    pub log_level: Option<String>,
    #[serde(default)]
    pub quiet: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransportConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    // STARTTLS
    #[serde(default)]
    pub use_tls: bool,
    // Implicit TLS, wins over use_tls
    #[serde(default)]
    pub use_ssl: bool,
    pub timeout_seconds: Option<u64>,
}

pub const DEFAULT_SMTP_PORT: u16 = 25;

fn default_port() -> u16 {
    DEFAULT_SMTP_PORT
}

impl TransportConfig {
    /// Endpoint label used in delivery logs.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Implement loading configuration
impl AppConfig {
    // Load config from defaults, then file (if exists), then environment variables
    pub fn new() -> Result<Self, ConfigError> {
        Self::configure_defaults()?
            // Merge in config file if present
            .add_source(File::with_name("config").required(false))
            // Merge in environment variables
            // e.g. MAIL_TRANSPORT__HOST=... MAIL_RETRY__MAX_ATTEMPTS=...
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }

    // Load config from a specific file path
    pub fn new_from_file(path: &str) -> Result<Self, ConfigError> {
        Self::configure_defaults()?
            .add_source(File::with_name(path).required(true))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }

    // Single underscore after the prefix, double between nested keys
    fn environment() -> Environment {
        Environment::with_prefix("MAIL")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn configure_defaults()
    -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Ok(Config::builder())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn load(toml_str: &str) -> Result<AppConfig, ConfigError> {
        AppConfig::configure_defaults()
            .unwrap()
            .add_source(File::from_str(toml_str, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
    }

    #[test]
    fn test_valid_config_deserialization() {
        let toml_str = r#"
            default_sender = "noreply@example.com"
            log_level = "debug"

            [transport]
            host = "smtp.example.com"
            port = 587
            username = "sender_user"
            password = "sender_pass"
            use_tls = true
            timeout_seconds = 15

            [retry]
            max_attempts = 5
            base_backoff_ms = 250
        "#;

        let config = load(toml_str).unwrap();

        assert_eq!(config.default_sender.as_deref(), Some("noreply@example.com"));
        assert_eq!(config.transport.host, "smtp.example.com");
        assert_eq!(config.transport.port, 587);
        assert_eq!(config.transport.username.as_deref(), Some("sender_user"));
        assert!(config.transport.use_tls);
        assert!(!config.transport.use_ssl);
        assert_eq!(config.transport.timeout_seconds, Some(15));
        assert_eq!(config.transport.endpoint(), "smtp.example.com:587");

        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_backoff_ms, 250);
    }

    #[test]
    fn test_environment_overrides_file() {
        let toml_str = r#"
            [transport]
            host = "smtp.example.com"
            port = 587

            [retry]
            max_attempts = 3
        "#;

        let vars = [
            ("MAIL_TRANSPORT__HOST", "relay.internal"),
            ("MAIL_RETRY__MAX_ATTEMPTS", "7"),
            ("MAIL_DEFAULT_SENDER", "ops@example.com"),
            // Double separator after the prefix is not the documented form
            ("MAIL__TRANSPORT__PORT", "2525"),
            ("OTHER_TRANSPORT__HOST", "ignored.example.com"),
        ];

        let config: AppConfig = AppConfig::configure_defaults()
            .unwrap()
            .add_source(File::from_str(toml_str, FileFormat::Toml))
            .add_source(
                AppConfig::environment().source(Some(
                    vars.iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                )),
            )
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.transport.host, "relay.internal");
        assert_eq!(config.transport.port, 587);
        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.retry.base_backoff_ms, 500);
        assert_eq!(config.default_sender.as_deref(), Some("ops@example.com"));
    }

    #[test]
    fn test_environment_alone_is_enough() {
        let vars = [("MAIL_TRANSPORT__HOST", "env-only.example.com")];

        let config: AppConfig = AppConfig::configure_defaults()
            .unwrap()
            .add_source(
                AppConfig::environment().source(Some(
                    vars.iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                )),
            )
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.transport.host, "env-only.example.com");
        assert_eq!(config.transport.port, DEFAULT_SMTP_PORT);
    }

    #[test]
    fn test_default_values() {
        // Minimal config: no port, no credentials, no retry section
        let toml_str = r#"
            [transport]
            host = "localhost"
        "#;

        let config = load(toml_str).unwrap();

        assert_eq!(config.transport.port, DEFAULT_SMTP_PORT);
        assert!(config.transport.username.is_none());
        assert!(!config.transport.use_tls);
        assert!(!config.quiet);
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_partial_retry_section() {
        let toml_str = r#"
            [transport]
            host = "localhost"

            [retry]
            max_attempts = 1
        "#;

        let config = load(toml_str).unwrap();
        assert_eq!(config.retry.max_attempts, 1);
        assert_eq!(config.retry.base_backoff_ms, 500);
    }

    #[test]
    fn test_missing_transport() {
        let toml_str = r#"
            log_level = "info"
        "#;

        assert!(load(toml_str).is_err());
    }

    #[test]
    fn test_invalid_config_type() {
        let toml_str = r#"
            [transport]
            host = "h"
            port = "not a port"
        "#;

        assert!(load(toml_str).is_err());
    }
}
