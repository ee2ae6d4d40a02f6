//! Container engine capability
//!
//! Everything the rest of the crate knows about the container engine goes
//! through the [`ContainerEngine`] trait. The handle is shared between the
//! single-shot operations and every running sweep, so implementations must be
//! safe for concurrent use and hold no per-call state.

pub mod docker;

use std::time::Duration;

use async_trait::async_trait;
use bollard::container::Config;
use bollard::models::HostConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use docker::DockerEngine;

/// Errors surfaced by the container engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("docker api error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("failed to connect to container engine: {0}")]
    Connect(String),

    #[error("exec session {0} finished without an exit code")]
    MissingExitCode(String),

    #[error("wait on container {0} ended without a status")]
    WaitEnded(String),

    #[error("failed to encode engine response: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A running container as reported by the engine's list operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerRef {
    pub id: String,
    pub command: String,
}

impl ContainerRef {
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
        }
    }
}

/// Exit code and captured output of one exec session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i64,
    pub output: Vec<u8>,
}

/// Streams attached when an exec session is created
///
/// The attach step reuses whatever the session was created with, so these
/// options are the only place the attached streams are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOptions {
    #[serde(default = "default_true")]
    pub attach_stdout: bool,

    #[serde(default)]
    pub attach_stderr: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            attach_stdout: true,
            attach_stderr: false,
        }
    }
}

/// Remote API of a container engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// List running containers
    async fn list_containers(&self) -> Result<Vec<ContainerRef>, EngineError>;

    /// Create a container, returning its ID
    async fn create_container(
        &self,
        config: Config<String>,
        host_config: HostConfig,
    ) -> Result<String, EngineError>;

    async fn start_container(&self, id: &str) -> Result<(), EngineError>;

    /// Stop a container, letting the engine pick the grace period when `timeout` is `None`
    async fn stop_container(&self, id: &str, timeout: Option<Duration>) -> Result<(), EngineError>;

    async fn remove_container(&self, id: &str) -> Result<(), EngineError>;

    /// Block until the container exits and return its exit code
    async fn wait_container(&self, id: &str) -> Result<i64, EngineError>;

    /// Combined stdout and stderr logs
    async fn container_logs(&self, id: &str) -> Result<Vec<u8>, EngineError>;

    /// Create an exec session and return its ID
    async fn create_exec(
        &self,
        id: &str,
        command: Vec<String>,
        options: ExecOptions,
    ) -> Result<String, EngineError>;

    /// Start an exec session and read its attached output to completion
    async fn attach_exec(&self, exec_id: &str) -> Result<Vec<u8>, EngineError>;

    /// Exit code of a finished exec session
    async fn inspect_exec(&self, exec_id: &str) -> Result<i64, EngineError>;

    /// IP address on the default network, empty when the container has none
    async fn container_ip_address(&self, id: &str) -> Result<String, EngineError>;

    /// Full inspection payload as JSON, including size information
    async fn inspect_container_raw(&self, id: &str) -> Result<Vec<u8>, EngineError>;

    async fn remove_image(&self, name: &str) -> Result<(), EngineError>;

    /// Create an anonymous volume, returning its generated name
    async fn create_volume(&self) -> Result<String, EngineError>;

    async fn remove_volume(&self, name: &str) -> Result<(), EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_options_default_attaches_stdout_only() {
        let options = ExecOptions::default();
        assert!(options.attach_stdout);
        assert!(!options.attach_stderr);
    }

    #[test]
    fn test_exec_options_deserialize_missing_fields() {
        let options: ExecOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ExecOptions::default());
    }

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::MissingExitCode("abc".to_string());
        assert_eq!(err.to_string(), "exec session abc finished without an exit code");
    }
}
