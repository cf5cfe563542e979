//! Registers the self-updating agent binary as a host service
//!
//! Once installed, the agent runs under the init system rather than the
//! in-process Supervisor, so it survives its parent across upgrades.

use crate::domain::Result;
use crate::domain::services::unit_controller::SystemdController;
use crate::domain::services::unit_files::{UnitFileWriter, exec_start_override, render_unit};
use crate::domain::value_objects::UnitName;
use std::path::Path;
use tracing::info;

/// Name of the drop-in carrying the install-time `ExecStart`
pub const EXEC_DROP_IN: &str = "exec-start";

pub const DEFAULT_MANAGER_UNIT_TEMPLATE: &str = "\
[Unit]
Description=Node agent
Wants=network-online.target
After=network-online.target

[Service]
Type=simple
ExecStart=%exe_path%
KillMode=process
Restart=always
RestartSec=5

[Install]
WantedBy=multi-user.target
";

pub struct ManagerServiceInstaller {
    unit: UnitName,
    template: String,
    writer: UnitFileWriter,
    controller: SystemdController,
}

impl ManagerServiceInstaller {
    pub fn new(unit: &str, writer: UnitFileWriter, controller: SystemdController) -> Self {
        Self {
            unit: UnitName::new(unit),
            template: DEFAULT_MANAGER_UNIT_TEMPLATE.to_string(),
            writer,
            controller,
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn unit(&self) -> &UnitName {
        &self.unit
    }

    /// Write the unit and its `ExecStart` drop-in, then bring the service up
    ///
    /// When the files changed and the service is already running it is
    /// restarted so the new binary takes over.
    pub async fn install(&self, exe_path: &Path, args: &[String]) -> Result<()> {
        let unit_changed = self
            .writer
            .write_unit(&self.unit, &render_unit(&self.template, exe_path))?;
        let drop_in_changed = self.writer.write_drop_in(
            &self.unit,
            EXEC_DROP_IN,
            &exec_start_override(exe_path, args),
        )?;
        let changed = unit_changed || drop_in_changed;

        if changed {
            self.controller.reload().await?;
        }

        if changed && self.controller.is_active(self.unit.as_str()).await? {
            info!(unit = %self.unit, exe = %exe_path.display(), "Upgrading running service");
            self.controller.restart(self.unit.as_str()).await?;
        } else {
            self.controller.enable_and_start(self.unit.as_str()).await?;
        }

        info!(unit = %self.unit, exe = %exe_path.display(), "Service installed");
        Ok(())
    }

    /// Stop and disable the service, then remove its files
    pub async fn uninstall(&self) -> Result<()> {
        self.controller.stop(self.unit.as_str()).await?;
        self.controller.disable(self.unit.as_str()).await?;

        let drop_in_removed = self.writer.remove_drop_in(&self.unit, EXEC_DROP_IN)?;
        let unit_removed = self.writer.remove_unit(&self.unit)?;
        if drop_in_removed || unit_removed {
            self.controller.reload().await?;
        }

        info!(unit = %self.unit, "Service uninstalled");
        Ok(())
    }
}
