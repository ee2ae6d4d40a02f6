//! dockwatch library
//!
//! A thin façade over a Docker-compatible engine plus two background sweeps
//! that periodically exec into, or inspect, every running container.

use std::sync::Arc;

pub mod config;
pub mod container;
pub mod engine;
pub mod logging;
pub mod metrics;
pub mod monitor;

use crate::config::AppConfig;
use crate::container::ContainerClient;
use crate::engine::ContainerEngine;
use crate::monitor::ContainerMonitor;

/// Handles shared by the sweeps and the single-shot operations
pub struct AppState {
    pub config: AppConfig,
    pub client: ContainerClient,
    pub monitor: ContainerMonitor,
}

impl AppState {
    /// Wire one engine handle into both the client and the monitor
    pub fn new(config: AppConfig, engine: Arc<dyn ContainerEngine>) -> Self {
        let client = ContainerClient::new(engine, config.exec);
        let monitor = ContainerMonitor::new(client.clone(), config.sweep.interval());

        Self {
            config,
            client,
            monitor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockContainerEngine;

    #[test]
    fn test_app_state_uses_configured_interval() {
        let mut config = AppConfig::default();
        config.sweep.interval_seconds = 5;

        let state = AppState::new(config, Arc::new(MockContainerEngine::new()));
        assert_eq!(state.monitor.interval().as_secs(), 5);
        assert!(state.client.exec_options().attach_stdout);
    }
}
