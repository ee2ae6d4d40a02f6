//! Docker Engine API backend built on bollard

use std::time::Duration;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions, LogOutput,
    LogsOptions, RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
    WaitContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::RemoveImageOptions;
use bollard::models::HostConfig;
use bollard::volume::{CreateVolumeOptions, RemoveVolumeOptions};
use bollard::Docker;
use futures::StreamExt;
use tracing::{debug, info};

use crate::config::DockerConfig;

use super::{ContainerEngine, ContainerRef, EngineError, ExecOptions};

/// Container engine reached through the Docker remote API
#[derive(Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect using the socket from `config`, or the local defaults
    /// (`DOCKER_HOST` or the platform socket) when none is set.
    pub fn connect(config: &DockerConfig) -> Result<Self, EngineError> {
        let docker = match config.socket {
            Some(ref socket) => Docker::connect_with_unix(
                socket,
                config.timeout_seconds,
                bollard::API_DEFAULT_VERSION,
            ),
            None => Docker::connect_with_local_defaults()
                .map(|docker| docker.with_timeout(Duration::from_secs(config.timeout_seconds))),
        }
        .map_err(|e| EngineError::Connect(e.to_string()))?;

        info!(socket = ?config.socket, "Docker client configured");
        Ok(Self { docker })
    }

    /// Engine version string, used as a connectivity check
    pub async fn version(&self) -> Result<String, EngineError> {
        let version = self.docker.version().await?;
        Ok(version.version.unwrap_or_default())
    }
}

fn append_log_output(buf: &mut Vec<u8>, chunk: LogOutput) {
    match chunk {
        LogOutput::StdOut { message }
        | LogOutput::StdErr { message }
        | LogOutput::StdIn { message }
        | LogOutput::Console { message } => buf.extend_from_slice(&message),
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    async fn list_containers(&self) -> Result<Vec<ContainerRef>, EngineError> {
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions::<String>::default()))
            .await?;

        Ok(containers
            .into_iter()
            .map(|c| ContainerRef::new(c.id.unwrap_or_default(), c.command.unwrap_or_default()))
            .collect())
    }

    async fn create_container(
        &self,
        config: Config<String>,
        host_config: HostConfig,
    ) -> Result<String, EngineError> {
        let config = Config {
            host_config: Some(host_config),
            ..config
        };

        let response = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await?;

        debug!(container_id = %response.id, warnings = ?response.warnings, "Container created");
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn stop_container(&self, id: &str, timeout: Option<Duration>) -> Result<(), EngineError> {
        let options = timeout.map(|t| StopContainerOptions {
            t: i64::try_from(t.as_secs()).unwrap_or(i64::MAX),
        });
        self.docker.stop_container(id, options).await?;
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .remove_container(id, None::<RemoveContainerOptions>)
            .await?;
        Ok(())
    }

    async fn wait_container(&self, id: &str) -> Result<i64, EngineError> {
        let mut stream = self
            .docker
            .wait_container(id, None::<WaitContainerOptions<String>>);

        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports a non-zero exit as an error; it is still a normal exit here
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(e.into()),
            None => Err(EngineError::WaitEnded(id.to_string())),
        }
    }

    async fn container_logs(&self, id: &str) -> Result<Vec<u8>, EngineError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            ..Default::default()
        };

        let mut stream = self.docker.logs(id, Some(options));
        let mut logs = Vec::new();
        while let Some(chunk) = stream.next().await {
            append_log_output(&mut logs, chunk?);
        }

        Ok(logs)
    }

    async fn create_exec(
        &self,
        id: &str,
        command: Vec<String>,
        options: ExecOptions,
    ) -> Result<String, EngineError> {
        let exec_options = CreateExecOptions {
            cmd: Some(command),
            attach_stdout: Some(options.attach_stdout),
            attach_stderr: Some(options.attach_stderr),
            ..Default::default()
        };

        let exec = self.docker.create_exec(id, exec_options).await?;
        debug!(container_id = %id, exec_id = %exec.id, "Exec session created");
        Ok(exec.id)
    }

    async fn attach_exec(&self, exec_id: &str) -> Result<Vec<u8>, EngineError> {
        let mut buf = Vec::new();

        // No start options: the streams chosen at creation apply
        if let StartExecResults::Attached { mut output, .. } =
            self.docker.start_exec(exec_id, None).await?
        {
            while let Some(chunk) = output.next().await {
                append_log_output(&mut buf, chunk?);
            }
        }

        Ok(buf)
    }

    async fn inspect_exec(&self, exec_id: &str) -> Result<i64, EngineError> {
        let inspect = self.docker.inspect_exec(exec_id).await?;
        inspect
            .exit_code
            .ok_or_else(|| EngineError::MissingExitCode(exec_id.to_string()))
    }

    async fn container_ip_address(&self, id: &str) -> Result<String, EngineError> {
        let inspect = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;

        Ok(inspect
            .network_settings
            .and_then(|settings| settings.ip_address)
            .unwrap_or_default())
    }

    // bollard only returns the typed inspect response. It is serialized back to
    // JSON here, so fields bollard does not model and unset fields are absent.
    async fn inspect_container_raw(&self, id: &str) -> Result<Vec<u8>, EngineError> {
        let inspect = self
            .docker
            .inspect_container(id, Some(InspectContainerOptions { size: true }))
            .await?;

        Ok(serde_json::to_vec(&inspect)?)
    }

    async fn remove_image(&self, name: &str) -> Result<(), EngineError> {
        let deleted = self
            .docker
            .remove_image(name, None::<RemoveImageOptions>, None)
            .await?;
        debug!(image = %name, layers = deleted.len(), "Image removed");
        Ok(())
    }

    async fn create_volume(&self) -> Result<String, EngineError> {
        let volume = self
            .docker
            .create_volume(CreateVolumeOptions::<String>::default())
            .await?;
        Ok(volume.name)
    }

    async fn remove_volume(&self, name: &str) -> Result<(), EngineError> {
        self.docker
            .remove_volume(name, None::<RemoveVolumeOptions>)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: These tests require a running Docker daemon
    // Run them with `cargo test -- --ignored`

    #[tokio::test]
    #[ignore]
    async fn test_connect_with_local_defaults() {
        let engine = DockerEngine::connect(&DockerConfig::default()).unwrap();
        assert!(!engine.version().await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore]
    async fn test_volume_lifecycle() {
        let engine = DockerEngine::connect(&DockerConfig::default()).unwrap();
        let name = engine.create_volume().await.unwrap();
        assert!(!name.is_empty());
        engine.remove_volume(&name).await.unwrap();
    }

    #[test]
    fn test_append_log_output_keeps_both_streams() {
        let mut buf = Vec::new();
        append_log_output(&mut buf, LogOutput::StdOut { message: "out\n".into() });
        append_log_output(&mut buf, LogOutput::StdErr { message: "err\n".into() });
        assert_eq!(buf, b"out\nerr\n");
    }
}
