//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `TEXTGATE_CONFIG`
//! environment variable. A missing file is not an error: every field has a default.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `TEXTGATE_` override YAML values
//! 3. **Standard AWS variables** - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`,
//!    `AWS_SESSION_TOKEN` and `AWS_REGION` fill the `detection` credentials and region
//! 4. **PORT** - overrides `port` if set
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `TEXTGATE_DETECTION__TIMEOUT=10s` sets the `detection.timeout` field.
//!
//! ## Example
//!
//! ```yaml
//! port: 8081
//! storage:
//!   directory: ./images
//!   case_sensitive_extensions: false
//! detection:
//!   region: eu-west-1
//!   timeout: 30s
//! limits:
//!   max_file_size: 15728640
//! telemetry:
//!   log_format: json
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "TEXTGATE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// Where uploads live while their request is in flight
    pub storage: StorageConfig,
    /// Text detection provider settings
    pub detection: DetectionConfig,
    /// Upload limits
    pub limits: LimitsConfig,
    /// Log output and trace export
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory for uploaded images; created on startup if missing
    pub directory: PathBuf,
    /// Only accept the lowercase spellings `.png`, `.jpg`, `.jpeg`
    pub case_sensitive_extensions: bool,
}

/// Provider connection settings.
///
/// When `credential_id` and `credential_secret` are both unset the AWS default
/// credential chain is used.
#[derive(Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    pub credential_id: Option<String>,
    pub credential_secret: Option<String>,
    pub session_token: Option<String>,
    pub region: String,
    /// Override the provider endpoint (local emulators, tests)
    pub endpoint_url: Option<String>,
    /// Upper bound on a single detection call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum upload size in bytes
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    pub log_format: LogFormat,
    /// Export spans over OTLP, configured through the standard `OTEL_*` environment variables
    pub otel_export: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
            storage: StorageConfig::default(),
            detection: DetectionConfig::default(),
            limits: LimitsConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./images"),
            case_sensitive_extensions: false,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            credential_id: None,
            credential_secret: None,
            session_token: None,
            region: "us-east-1".to_string(),
            endpoint_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: 15 * 1024 * 1024, // 15MB
        }
    }
}

impl std::fmt::Debug for DetectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("DetectionConfig")
            .field("credential_id", &self.credential_id)
            .field("credential_secret", &redacted(&self.credential_secret))
            .field("session_token", &redacted(&self.session_token))
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.storage.directory.as_os_str().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: storage.directory cannot be empty".to_string(),
            });
        }

        if self.limits.max_file_size == 0 {
            return Err(Error::Internal {
                operation: "Config validation: limits.max_file_size must be greater than 0".to_string(),
            });
        }

        if self.detection.timeout.is_zero() {
            return Err(Error::Internal {
                operation: "Config validation: detection.timeout must be greater than 0".to_string(),
            });
        }

        if self.detection.region.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: detection.region cannot be empty".to_string(),
            });
        }

        match (&self.detection.credential_id, &self.detection.credential_secret) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(Error::Internal {
                    operation: "Config validation: detection.credential_id and detection.credential_secret must be set together. \
                     Set both AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY, or neither to use the default credential chain."
                        .to_string(),
                });
            }
            _ => {}
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("TEXTGATE_").split("__").ignore(&["config"]))
            // Standard AWS variables
            .merge(
                Env::raw()
                    .only(&["AWS_ACCESS_KEY_ID"])
                    .map(|_| "detection.credential_id".into()),
            )
            .merge(
                Env::raw()
                    .only(&["AWS_SECRET_ACCESS_KEY"])
                    .map(|_| "detection.credential_secret".into()),
            )
            .merge(
                Env::raw()
                    .only(&["AWS_SESSION_TOKEN"])
                    .map(|_| "detection.session_token".into()),
            )
            .merge(Env::raw().only(&["AWS_REGION"]).map(|_| "detection.region".into()))
            .merge(Env::raw().only(&["PORT"]).map(|_| "port".into()))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
