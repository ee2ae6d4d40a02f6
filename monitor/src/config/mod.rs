//! Configuration module for dockwatch
//!
//! Supports configuration via:
//! - YAML/TOML config files
//! - Environment variables (with DOCKWATCH_ prefix, `__` between sections)
//! - A `.env` file in the working directory

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::engine::ExecOptions;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Container engine connection
    #[serde(default)]
    pub docker: DockerConfig,

    /// Background sweep settings
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Streams attached to exec sessions
    #[serde(default)]
    pub exec: ExecOptions,

    /// Metrics settings
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Container engine connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerConfig {
    /// Unix socket path; local defaults (and DOCKER_HOST) apply when unset
    #[serde(default)]
    pub socket: Option<String>,

    /// Request timeout for engine API calls
    #[serde(default = "default_docker_timeout")]
    pub timeout_seconds: u64,
}

/// Sweep configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds slept before every sweep
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,

    /// Run the exec sweep
    #[serde(default)]
    pub exec_enabled: bool,

    /// Command executed inside every running container
    #[serde(default = "default_exec_command")]
    pub exec_command: Vec<String>,

    /// Run the inspect sweep
    #[serde(default = "default_true")]
    pub inspect_enabled: bool,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Serve a Prometheus scrape endpoint
    #[serde(default)]
    pub enabled: bool,

    /// Address of the scrape endpoint
    #[serde(default = "default_metrics_listen")]
    pub listen: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_docker_timeout() -> u64 {
    120
}

fn default_interval() -> u64 {
    60
}

fn default_exec_command() -> Vec<String> {
    vec!["uptime".to_string()]
}

fn default_true() -> bool {
    true
}

fn default_metrics_listen() -> String {
    "0.0.0.0:9187".to_string()
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: None,
            timeout_seconds: default_docker_timeout(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            exec_enabled: false,
            exec_command: default_exec_command(),
            inspect_enabled: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_metrics_listen(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            docker: DockerConfig::default(),
            sweep: SweepConfig::default(),
            exec: ExecOptions::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file if present
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config/dockwatch").required(false))
            .add_source(config::File::with_name("/etc/dockwatch/config").required(false))
            .add_source(
                config::Environment::with_prefix("DOCKWATCH")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(" ")
                    .with_list_parse_key("sweep.exec_command"),
            )
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.sweep.interval_seconds == 0 {
            anyhow::bail!("Sweep interval cannot be 0");
        }

        if self.sweep.exec_enabled && self.sweep.exec_command.is_empty() {
            anyhow::bail!("Exec sweep is enabled but no command is configured");
        }

        if self.docker.timeout_seconds == 0 {
            anyhow::bail!("Docker timeout cannot be 0");
        }

        if !self.exec.attach_stdout && !self.exec.attach_stderr {
            anyhow::bail!("Exec sessions must attach stdout, stderr or both");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.sweep.interval(), Duration::from_secs(60));
        assert!(config.sweep.inspect_enabled);
        assert!(!config.sweep.exec_enabled);
        assert!(config.exec.attach_stdout);
        assert!(!config.exec.attach_stderr);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = AppConfig {
            sweep: SweepConfig {
                interval_seconds: 0,
                ..SweepConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_exec_sweep_requires_command() {
        let config = AppConfig {
            sweep: SweepConfig {
                exec_enabled: true,
                exec_command: vec![],
                ..SweepConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_exec_must_attach_a_stream() {
        let config = AppConfig {
            exec: ExecOptions {
                attach_stdout: false,
                attach_stderr: false,
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
