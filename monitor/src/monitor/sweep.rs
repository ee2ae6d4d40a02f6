//! Periodic exec and inspect sweeps over running containers

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::container::ContainerClient;
use crate::engine::ContainerRef;
use crate::metrics;

use super::format::indent_json;

/// Time slept before every sweep
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Action a sweep performs on every container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepKind {
    Exec,
    Inspect,
}

impl SweepKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepKind::Exec => "exec",
            SweepKind::Inspect => "inspect",
        }
    }
}

/// Tally of one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub found: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Runs sweeps over whatever containers are running at the time
///
/// Both loops sleep first, then check the token, then sweep. A sweep that has
/// started always visits every listed container.
pub struct ContainerMonitor {
    client: ContainerClient,
    interval: Duration,
}

impl ContainerMonitor {
    pub fn new(client: ContainerClient, interval: Duration) -> Self {
        Self { client, interval }
    }

    pub fn with_default_interval(client: ContainerClient) -> Self {
        Self::new(client, DEFAULT_SWEEP_INTERVAL)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `command` in every running container each interval until `token` is cancelled
    pub async fn run_exec_sweep<W>(&self, sink: &mut W, token: CancellationToken, command: &[String])
    where
        W: AsyncWrite + Unpin + Send,
    {
        info!(interval_secs = self.interval.as_secs(), command = ?command, "Exec sweep started");

        while self.wait_for_next_sweep(&token).await {
            let span = info_span!("sweep", kind = "exec", sweep_id = %Uuid::new_v4());
            self.exec_sweep(sink, command).instrument(span).await;
        }

        info!("Exec sweep stopped");
    }

    /// Print the inspection payload of every running container each interval until `token` is cancelled
    pub async fn run_inspect_sweep<W>(&self, sink: &mut W, token: CancellationToken)
    where
        W: AsyncWrite + Unpin + Send,
    {
        info!(interval_secs = self.interval.as_secs(), "Inspect sweep started");

        while self.wait_for_next_sweep(&token).await {
            let span = info_span!("sweep", kind = "inspect", sweep_id = %Uuid::new_v4());
            self.inspect_sweep(sink).instrument(span).await;
        }

        info!("Inspect sweep stopped");
    }

    /// One exec pass. Returns `None` when the containers could not be listed.
    ///
    /// The success line renders `command` with debug list formatting, so
    /// `echo hi` appears as `["echo", "hi"]`.
    pub async fn exec_sweep<W>(&self, sink: &mut W, command: &[String]) -> Option<SweepReport>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let containers = self.list_for_sweep(SweepKind::Exec, sink).await?;
        let mut report = SweepReport {
            found: containers.len(),
            ..SweepReport::default()
        };

        for container in &containers {
            announce(sink, container).await;

            match self.client.exec_in_container(&container.id, command).await {
                Ok(result) => {
                    let mut line = format!(
                        "exec of command {:?} into {} had rc {} and text ",
                        command, container.id, result.exit_code
                    )
                    .into_bytes();
                    line.extend_from_slice(&result.output);
                    emit(sink, &line).await;
                    report.succeeded += 1;
                }
                Err(e) => {
                    warn!(container_id = %container.id, error = %e, "Exec failed");
                    emit(sink, format!("container exec error: {}", e).as_bytes()).await;
                    metrics::record_container_error(SweepKind::Exec.as_str());
                    report.failed += 1;
                }
            }
        }

        debug!(found = report.found, failed = report.failed, "Exec sweep finished");
        Some(report)
    }

    /// One inspect pass. Returns `None` when the containers could not be listed.
    pub async fn inspect_sweep<W>(&self, sink: &mut W) -> Option<SweepReport>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let containers = self.list_for_sweep(SweepKind::Inspect, sink).await?;
        let mut report = SweepReport {
            found: containers.len(),
            ..SweepReport::default()
        };

        for container in &containers {
            announce(sink, container).await;

            let body = match self.client.inspect_container_raw(&container.id).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(container_id = %container.id, error = %e, "Inspect failed");
                    emit(sink, format!("container inspect error: {}", e).as_bytes()).await;
                    metrics::record_container_error(SweepKind::Inspect.as_str());
                    report.failed += 1;
                    continue;
                }
            };

            let line = match indent_json(&body) {
                Ok(formatted) => {
                    let mut line =
                        format!("inspect of {} returned formatted json:\n", container.id).into_bytes();
                    line.extend_from_slice(&formatted);
                    line
                }
                Err(e) => {
                    debug!(container_id = %container.id, error = %e, "Inspect payload is not valid JSON");
                    let mut line = format!("inspect of {} returned raw json ", container.id).into_bytes();
                    line.extend_from_slice(&body);
                    line
                }
            };
            emit(sink, &line).await;
            report.succeeded += 1;
        }

        debug!(found = report.found, failed = report.failed, "Inspect sweep finished");
        Some(report)
    }

    /// Sleep for the interval, then report whether another sweep should run.
    ///
    /// Cancellation cuts the sleep short; it is never observed mid-sweep.
    async fn wait_for_next_sweep(&self, token: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = token.cancelled() => false,
            _ = tokio::time::sleep(self.interval) => !token.is_cancelled(),
        }
    }

    async fn list_for_sweep<W>(&self, kind: SweepKind, sink: &mut W) -> Option<Vec<ContainerRef>>
    where
        W: AsyncWrite + Unpin + Send,
    {
        match self.client.list_containers().await {
            Ok(containers) => {
                emit(sink, format!("found {} containers", containers.len()).as_bytes()).await;
                metrics::record_sweep(kind.as_str(), containers.len());
                Some(containers)
            }
            Err(e) => {
                warn!(error = %e, "Container list failed");
                emit(sink, format!("container list error: {}", e).as_bytes()).await;
                metrics::record_list_error(kind.as_str());
                None
            }
        }
    }
}

async fn announce<W>(sink: &mut W, container: &ContainerRef)
where
    W: AsyncWrite + Unpin + Send,
{
    let line = format!(
        "found container {} running command {}",
        container.id, container.command
    );
    emit(sink, line.as_bytes()).await;
}

/// Write one line to the sink in a single write. Sink failures are logged and otherwise ignored.
async fn emit<W>(sink: &mut W, line: &[u8])
where
    W: AsyncWrite + Unpin + Send,
{
    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line);
    buf.push(b'\n');

    let result = async {
        sink.write_all(&buf).await?;
        sink.flush().await
    }
    .await;

    if let Err(e) = result {
        warn!(error = %e, "Failed to write to sweep output");
    }
}
