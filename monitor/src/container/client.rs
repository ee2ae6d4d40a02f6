//! Single-shot container operations

use std::sync::Arc;
use std::time::Duration;

use bollard::container::Config;
use bollard::models::HostConfig;
use tracing::{debug, info};

use crate::engine::{ContainerEngine, ContainerRef, EngineError, ExecOutput, ExecOptions};

/// Thin, cloneable façade over a shared container engine handle
///
/// Engine errors are returned to the caller untouched; nothing here retries.
#[derive(Clone)]
pub struct ContainerClient {
    engine: Arc<dyn ContainerEngine>,
    exec_options: ExecOptions,
}

impl ContainerClient {
    pub fn new(engine: Arc<dyn ContainerEngine>, exec_options: ExecOptions) -> Self {
        Self {
            engine,
            exec_options,
        }
    }

    pub fn exec_options(&self) -> ExecOptions {
        self.exec_options
    }

    pub async fn list_containers(&self) -> Result<Vec<ContainerRef>, EngineError> {
        self.engine.list_containers().await
    }

    pub async fn create_container(
        &self,
        config: Config<String>,
        host_config: HostConfig,
    ) -> Result<String, EngineError> {
        let id = self.engine.create_container(config, host_config).await?;
        info!(container_id = %id, "Container created");
        Ok(id)
    }

    pub async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.engine.start_container(id).await?;
        info!(container_id = %id, "Container started");
        Ok(())
    }

    pub async fn stop_container(&self, id: &str, timeout: Option<Duration>) -> Result<(), EngineError> {
        self.engine.stop_container(id, timeout).await?;
        info!(container_id = %id, "Container stopped");
        Ok(())
    }

    pub async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        self.engine.remove_container(id).await?;
        info!(container_id = %id, "Container removed");
        Ok(())
    }

    /// Stop then remove; a failed stop is returned and the container is left in place
    pub async fn stop_and_remove_container(
        &self,
        id: &str,
        timeout: Option<Duration>,
    ) -> Result<(), EngineError> {
        self.stop_container(id, timeout).await?;
        self.remove_container(id).await
    }

    pub async fn wait_container(&self, id: &str) -> Result<i64, EngineError> {
        self.engine.wait_container(id).await
    }

    pub async fn container_logs(&self, id: &str) -> Result<Vec<u8>, EngineError> {
        self.engine.container_logs(id).await
    }

    /// Run `command` in a running container and collect its exit code and output
    ///
    /// The session is created with the client's [`ExecOptions`], its output is
    /// read until the stream closes, and only then is the session inspected.
    pub async fn exec_in_container(
        &self,
        id: &str,
        command: &[String],
    ) -> Result<ExecOutput, EngineError> {
        let exec_id = self
            .engine
            .create_exec(id, command.to_vec(), self.exec_options)
            .await?;

        let output = self.engine.attach_exec(&exec_id).await?;
        let exit_code = self.engine.inspect_exec(&exec_id).await?;

        debug!(
            container_id = %id,
            exec_id = %exec_id,
            exit_code = exit_code,
            output_bytes = output.len(),
            "Exec completed"
        );

        Ok(ExecOutput { exit_code, output })
    }

    /// IP address of the container on the default network
    pub async fn inspect_container(&self, id: &str) -> Result<String, EngineError> {
        self.engine.container_ip_address(id).await
    }

    /// Full inspection payload as JSON bytes
    pub async fn inspect_container_raw(&self, id: &str) -> Result<Vec<u8>, EngineError> {
        self.engine.inspect_container_raw(id).await
    }

    pub async fn remove_image(&self, name: &str) -> Result<(), EngineError> {
        self.engine.remove_image(name).await?;
        info!(image = %name, "Image removed");
        Ok(())
    }

    pub async fn create_volume(&self) -> Result<String, EngineError> {
        let name = self.engine.create_volume().await?;
        info!(volume = %name, "Volume created");
        Ok(name)
    }

    pub async fn remove_volume(&self, name: &str) -> Result<(), EngineError> {
        self.engine.remove_volume(name).await?;
        info!(volume = %name, "Volume removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockContainerEngine;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn not_found() -> EngineError {
        EngineError::Docker(bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such container".to_string(),
        })
    }

    fn client(engine: MockContainerEngine) -> ContainerClient {
        ContainerClient::new(Arc::new(engine), ExecOptions::default())
    }

    #[tokio::test]
    async fn test_exec_creates_attaches_then_inspects() {
        let mut engine = MockContainerEngine::new();
        let mut seq = Sequence::new();

        engine
            .expect_create_exec()
            .withf(|id, cmd, options| {
                id == "c1" && *cmd == ["echo", "hi"] && *options == ExecOptions::default()
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok("exec-1".to_string()));
        engine
            .expect_attach_exec()
            .with(eq("exec-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(b"hi\n".to_vec()));
        engine
            .expect_inspect_exec()
            .with(eq("exec-1"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(0));

        let command = vec!["echo".to_string(), "hi".to_string()];
        let result = client(engine).exec_in_container("c1", &command).await.unwrap();

        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output, b"hi\n");
    }

    #[tokio::test]
    async fn test_exec_create_failure_skips_attach() {
        let mut engine = MockContainerEngine::new();
        engine
            .expect_create_exec()
            .returning(|_, _, _| Err(not_found()));
        engine.expect_attach_exec().never();
        engine.expect_inspect_exec().never();

        let result = client(engine)
            .exec_in_container("gone", &["true".to_string()])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_stop_and_remove() {
        let mut engine = MockContainerEngine::new();
        engine
            .expect_stop_container()
            .with(eq("c1"), eq(Some(Duration::from_secs(5))))
            .times(1)
            .returning(|_, _| Ok(()));
        engine
            .expect_remove_container()
            .with(eq("c1"))
            .times(1)
            .returning(|_| Ok(()));

        client(engine)
            .stop_and_remove_container("c1", Some(Duration::from_secs(5)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stop_failure_aborts_remove() {
        let mut engine = MockContainerEngine::new();
        engine
            .expect_stop_container()
            .returning(|_, _| Err(not_found()));
        engine.expect_remove_container().never();

        let err = client(engine)
            .stop_and_remove_container("gone", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_single_shot_errors_propagate() {
        let mut engine = MockContainerEngine::new();
        engine.expect_wait_container().returning(|_| Err(not_found()));
        engine.expect_container_logs().returning(|_| Err(not_found()));
        engine.expect_remove_image().returning(|_| Err(not_found()));

        let client = client(engine);
        assert!(client.wait_container("gone").await.is_err());
        assert!(client.container_logs("gone").await.is_err());
        assert!(client.remove_image("missing:latest").await.is_err());
    }

    #[tokio::test]
    async fn test_inspect_returns_ip_address() {
        let mut engine = MockContainerEngine::new();
        engine
            .expect_container_ip_address()
            .with(eq("c1"))
            .returning(|_| Ok("172.17.0.2".to_string()));

        let ip = client(engine).inspect_container("c1").await.unwrap();
        assert_eq!(ip, "172.17.0.2");
    }
}
