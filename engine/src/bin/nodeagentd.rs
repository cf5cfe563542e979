//! Node agent daemon
//!
//! `run` (the default) loads the configuration, initializes and starts every
//! component, then blocks until SIGTERM/SIGINT and stops them in reverse
//! order. `install`/`uninstall` register the daemon itself as a systemd
//! service so it outlives its parent across upgrades.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nodeagentd")]
#[command(about = "Node agent: supervises node components and systemd units")]
struct Args {
    /// Agent configuration file
    #[arg(long, env = "NODEAGENT_CONFIG", default_value = nodeagent_engine::infrastructure::DEFAULT_CONFIG_PATH, global = true)]
    config: PathBuf,

    /// Log filter (e.g. `debug`, `nodeagent_engine=trace`); overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the agent in the foreground (default)
    Run,
    /// Install this binary as a systemd service and start it
    Install {
        #[arg(long, default_value = "nodeagent")]
        unit: String,
        #[arg(long, default_value = nodeagent_engine::domain::constants::DEFAULT_UNIT_DIR)]
        unit_dir: PathBuf,
    },
    /// Stop, disable and remove the systemd service
    Uninstall {
        #[arg(long, default_value = "nodeagent")]
        unit: String,
        #[arg(long, default_value = nodeagent_engine::domain::constants::DEFAULT_UNIT_DIR)]
        unit_dir: PathBuf,
    },
}

#[cfg(unix)]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // --log-level, then RUST_LOG, fallback to info
    let filter = match &args.log_level {
        Some(level) => tracing_subscriber::EnvFilter::try_new(level)
            .with_context(|| format!("invalid log level '{level}'"))?,
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    match args.command.unwrap_or(Command::Run) {
        Command::Run => unix::run(&args.config).await,
        Command::Install { unit, unit_dir } => unix::install(&args.config, &unit, unit_dir).await,
        Command::Uninstall { unit, unit_dir } => unix::uninstall(&unit, unit_dir).await,
    }
}

#[cfg(unix)]
mod unix {
    use super::*;
    use nodeagent_engine::application::{
        AgentServices, Startup, build_manager, start_until_shutdown,
    };
    use nodeagent_engine::domain::services::{
        ManagerServiceInstaller, SystemdController, UnitFileWriter,
    };
    use nodeagent_engine::infrastructure::{AgentConfig, HostProcessTable, SystemdBus};
    use std::path::Path;
    use std::sync::Arc;
    use tokio::signal::unix::{SignalKind, signal};
    use tracing::{error, info};

    pub async fn run(config_path: &Path) -> anyhow::Result<()> {
        info!(
            config = %config_path.display(),
            "nodeagentd starting (version {})",
            env!("CARGO_PKG_VERSION")
        );

        let config = AgentConfig::load(config_path)?;
        let services = AgentServices {
            process_table: Arc::new(HostProcessTable::new()),
            init_system: Arc::new(SystemdBus::new()),
        };
        let manager = build_manager(&config, &services)?;

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        let shutdown = async {
            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM during startup"),
                _ = sigint.recv() => info!("received SIGINT during startup"),
            }
        };
        match start_until_shutdown(&manager, shutdown).await {
            Ok(Startup::Completed) => {}
            Ok(Startup::Interrupted) => return Ok(()),
            Err(e) => {
                error!(error = %e, "startup failed");
                return Err(e).context("starting components");
            }
        }
        info!(components = ?manager.started_names().await, "all components started");

        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }

        info!("nodeagentd shutting down");
        manager.stop().await.context("stopping components")?;
        Ok(())
    }

    fn installer(unit: &str, unit_dir: PathBuf) -> ManagerServiceInstaller {
        let controller = SystemdController::new(Arc::new(SystemdBus::new()));
        ManagerServiceInstaller::new(unit, UnitFileWriter::new(unit_dir), controller)
    }

    pub async fn install(config_path: &Path, unit: &str, unit_dir: PathBuf) -> anyhow::Result<()> {
        let exe = std::env::current_exe().context("resolving own executable path")?;
        let args = vec![
            "--config".to_string(),
            config_path.display().to_string(),
            "run".to_string(),
        ];
        installer(unit, unit_dir).install(&exe, &args).await?;
        Ok(())
    }

    pub async fn uninstall(unit: &str, unit_dir: PathBuf) -> anyhow::Result<()> {
        installer(unit, unit_dir).uninstall().await?;
        Ok(())
    }
}

#[cfg(not(unix))]
fn main() -> anyhow::Result<()> {
    let _ = Args::parse();
    anyhow::bail!("nodeagentd only runs on unix hosts")
}
