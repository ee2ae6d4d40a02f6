//! dockwatch CLI - one-shot container operations and foreground sweeps
//!
//! Talks to the container engine directly through the dockwatch library.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bollard::container::Config;
use bollard::models::HostConfig;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use dockwatch::config::AppConfig;
use dockwatch::container::ContainerClient;
use dockwatch::engine::DockerEngine;
use dockwatch::monitor::ContainerMonitor;

/// dockwatch - poke at running containers
#[derive(Parser)]
#[command(name = "dockwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Container engine facade with periodic exec and inspect sweeps", long_about = None)]
struct Cli {
    /// Docker socket path (defaults to DOCKER_HOST or the platform socket)
    #[arg(short, long)]
    socket: Option<String>,

    /// Emit diagnostic logs to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List running containers
    Ps,

    /// Create a container
    Create {
        /// Image to create the container from
        #[arg(short, long)]
        image: String,

        /// Environment variables (KEY=VALUE)
        #[arg(short, long)]
        env: Vec<String>,

        /// Bind mounts (host:container[:options])
        #[arg(short, long)]
        bind: Vec<String>,

        /// Command to run instead of the image default
        #[arg(last = true)]
        command: Vec<String>,
    },

    /// Start a container
    Start { id: String },

    /// Stop a container
    Stop {
        id: String,

        /// Seconds to wait before killing the container
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Remove a container
    Rm {
        id: String,

        /// Stop the container first
        #[arg(long)]
        stop: bool,

        /// Stop timeout in seconds (with --stop)
        #[arg(short, long, requires = "stop")]
        timeout: Option<u64>,
    },

    /// Wait for a container to exit and print its exit code
    Wait { id: String },

    /// Print combined stdout and stderr logs
    Logs { id: String },

    /// Run a command inside a running container
    Exec {
        id: String,

        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Print a container's IP address
    Ip { id: String },

    /// Remove an image
    Rmi { name: String },

    /// Manage volumes
    #[command(subcommand)]
    Volume(VolumeCommands),

    /// Run a sweep in the foreground until Ctrl+C
    #[command(subcommand)]
    Watch(WatchCommands),
}

#[derive(Subcommand)]
enum VolumeCommands {
    /// Create an anonymous volume and print its name
    Create,

    /// Remove a volume
    Rm { name: String },
}

#[derive(Subcommand)]
enum WatchCommands {
    /// Run a command in every running container each interval
    Exec {
        /// Seconds between sweeps
        #[arg(short, long)]
        interval: Option<u64>,

        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Print every running container's inspection payload each interval
    Inspect {
        /// Seconds between sweeps
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(socket) = cli.socket {
        config.docker.socket = Some(socket);
    }

    if cli.verbose {
        dockwatch::logging::init_logging("debug")?;
    }

    let engine = DockerEngine::connect(&config.docker).context("Failed to connect to Docker")?;
    let client = ContainerClient::new(Arc::new(engine), config.exec);

    match cli.command {
        Commands::Ps => {
            let containers = client.list_containers().await?;
            println!("{}", format!("{} running containers", containers.len()).bright_cyan().bold());
            for container in containers {
                println!("  {}  {}", container.id.bright_blue(), container.command);
            }
        }

        Commands::Create {
            image,
            env,
            bind,
            command,
        } => {
            let container_config = Config {
                image: Some(image),
                cmd: (!command.is_empty()).then_some(command),
                env: (!env.is_empty()).then_some(env),
                ..Default::default()
            };
            let host_config = HostConfig {
                binds: (!bind.is_empty()).then_some(bind),
                ..Default::default()
            };

            let id = client.create_container(container_config, host_config).await?;
            println!("{}", id);
        }

        Commands::Start { id } => {
            client.start_container(&id).await?;
            println!("{} {}", "✓ Started:".green(), id);
        }

        Commands::Stop { id, timeout } => {
            client.stop_container(&id, timeout.map(Duration::from_secs)).await?;
            println!("{} {}", "✓ Stopped:".green(), id);
        }

        Commands::Rm { id, stop, timeout } => {
            if stop {
                client
                    .stop_and_remove_container(&id, timeout.map(Duration::from_secs))
                    .await?;
            } else {
                client.remove_container(&id).await?;
            }
            println!("{} {}", "✓ Removed:".green(), id);
        }

        Commands::Wait { id } => {
            let code = client.wait_container(&id).await?;
            println!("{}", code);
        }

        Commands::Logs { id } => {
            let logs = client.container_logs(&id).await?;
            std::io::stdout()
                .write_all(&logs)
                .context("Failed to write logs")?;
        }

        Commands::Exec { id, command } => {
            let result = client.exec_in_container(&id, &command).await?;
            std::io::stdout()
                .write_all(&result.output)
                .context("Failed to write exec output")?;

            let rc = format!("rc {}", result.exit_code);
            if result.exit_code == 0 {
                eprintln!("{}", rc.green());
            } else {
                eprintln!("{}", rc.red());
            }
        }

        Commands::Ip { id } => {
            let ip = client.inspect_container(&id).await?;
            if ip.is_empty() {
                println!("{}", "(no address)".yellow());
            } else {
                println!("{}", ip);
            }
        }

        Commands::Rmi { name } => {
            client.remove_image(&name).await?;
            println!("{} {}", "✓ Removed image:".green(), name);
        }

        Commands::Volume(VolumeCommands::Create) => {
            let name = client.create_volume().await?;
            println!("{}", name);
        }

        Commands::Volume(VolumeCommands::Rm { name }) => {
            client.remove_volume(&name).await?;
            println!("{} {}", "✓ Removed volume:".green(), name);
        }

        Commands::Watch(watch) => {
            let token = CancellationToken::new();
            let canceller = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("{}", "Stopping after the current sweep...".yellow());
                    canceller.cancel();
                }
            });

            let mut stdout = tokio::io::stdout();
            match watch {
                WatchCommands::Exec { interval, command } => {
                    let interval = interval.unwrap_or(config.sweep.interval_seconds);
                    let monitor = ContainerMonitor::new(client, Duration::from_secs(interval));
                    monitor.run_exec_sweep(&mut stdout, token, &command).await;
                }
                WatchCommands::Inspect { interval } => {
                    let interval = interval.unwrap_or(config.sweep.interval_seconds);
                    let monitor = ContainerMonitor::new(client, Duration::from_secs(interval));
                    monitor.run_inspect_sweep(&mut stdout, token).await;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_exec_command() {
        let cli = Cli::try_parse_from(["dockwatch", "exec", "abc123", "--", "echo", "hi"]).unwrap();
        match cli.command {
            Commands::Exec { id, command } => {
                assert_eq!(id, "abc123");
                assert_eq!(command, vec!["echo", "hi"]);
            }
            _ => panic!("expected exec"),
        }
    }

    #[test]
    fn test_parse_watch_exec_with_interval() {
        let cli = Cli::try_parse_from(["dockwatch", "watch", "exec", "-i", "5", "--", "uptime"]).unwrap();
        match cli.command {
            Commands::Watch(WatchCommands::Exec { interval, command }) => {
                assert_eq!(interval, Some(5));
                assert_eq!(command, vec!["uptime"]);
            }
            _ => panic!("expected watch exec"),
        }
    }

    #[test]
    fn test_rm_timeout_requires_stop() {
        assert!(Cli::try_parse_from(["dockwatch", "rm", "abc", "--timeout", "3"]).is_err());
        assert!(Cli::try_parse_from(["dockwatch", "rm", "abc", "--stop", "--timeout", "3"]).is_ok());
    }
}
