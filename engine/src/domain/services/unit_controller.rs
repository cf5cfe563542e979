//! Systemd Unit Controller
//!
//! Drives named service units through the init system. Every public call
//! opens its own session and closes it before returning; no state about a
//! unit is cached between calls.

use crate::domain::ports::{InitSystem, InitSystemSession};
use crate::domain::value_objects::{JobKind, JobMode, UnitName};
use crate::domain::{DomainError, Result};
use std::sync::Arc;
use tracing::{debug, info};

const ACTIVE_STATE: &str = "ActiveState";
const UNIT_FILE_STATE: &str = "UnitFileState";

pub struct SystemdController {
    init: Arc<dyn InitSystem>,
}

impl SystemdController {
    pub fn new(init: Arc<dyn InitSystem>) -> Self {
        Self { init }
    }

    /// Enable the unit's files and start it, waiting for the start job
    pub async fn enable_and_start(&self, unit: &str) -> Result<()> {
        let unit = UnitName::new(unit);
        let session = self.init.connect().await?;

        session.enable_unit_files(std::slice::from_ref(&unit)).await?;
        debug!(unit = %unit, "Enabled unit files");

        run_job(session.as_ref(), JobKind::Start, &unit).await?;
        info!(unit = %unit, "Unit enabled and started");
        Ok(())
    }

    /// Restart the unit, starting it if it was not running
    pub async fn restart(&self, unit: &str) -> Result<()> {
        let unit = UnitName::new(unit);
        let session = self.init.connect().await?;

        run_job(session.as_ref(), JobKind::Restart, &unit).await?;
        info!(unit = %unit, "Unit restarted");
        Ok(())
    }

    /// Stop the unit; a unit that is not active is left untouched
    pub async fn stop(&self, unit: &str) -> Result<()> {
        let unit = UnitName::new(unit);
        let session = self.init.connect().await?;

        if !is_active(session.as_ref(), &unit).await? {
            debug!(unit = %unit, "Unit not active, nothing to stop");
            return Ok(());
        }

        run_job(session.as_ref(), JobKind::Stop, &unit).await?;
        info!(unit = %unit, "Unit stopped");
        Ok(())
    }

    /// Disable the unit's files; a unit that is not enabled is left untouched
    pub async fn disable(&self, unit: &str) -> Result<()> {
        let unit = UnitName::new(unit);
        let session = self.init.connect().await?;

        if !is_enabled(session.as_ref(), &unit).await? {
            debug!(unit = %unit, "Unit not enabled, nothing to disable");
            return Ok(());
        }

        session.disable_unit_files(std::slice::from_ref(&unit)).await?;
        info!(unit = %unit, "Unit disabled");
        Ok(())
    }

    pub async fn is_active(&self, unit: &str) -> Result<bool> {
        let unit = UnitName::new(unit);
        let session = self.init.connect().await?;
        is_active(session.as_ref(), &unit).await
    }

    pub async fn is_enabled(&self, unit: &str) -> Result<bool> {
        let unit = UnitName::new(unit);
        let session = self.init.connect().await?;
        is_enabled(session.as_ref(), &unit).await
    }

    pub async fn unit_exists(&self, unit: &str) -> Result<bool> {
        let unit = UnitName::new(unit);
        let session = self.init.connect().await?;
        session.unit_exists(&unit).await
    }

    /// Make the init system re-read unit files and drop-ins from disk
    pub async fn reload(&self) -> Result<()> {
        let session = self.init.connect().await?;
        session.reload().await?;
        info!("Reloaded init system unit definitions");
        Ok(())
    }
}

async fn run_job(session: &dyn InitSystemSession, kind: JobKind, unit: &UnitName) -> Result<()> {
    let result = session.submit_job(kind, unit, JobMode::Replace).await?;
    if !result.is_done() {
        return Err(DomainError::JobFailed {
            unit: unit.to_string(),
            job: kind.to_string(),
            result: result.to_string(),
        });
    }
    Ok(())
}

async fn is_active(session: &dyn InitSystemSession, unit: &UnitName) -> Result<bool> {
    Ok(session.unit_property(unit, ACTIVE_STATE).await? == "active")
}

async fn is_enabled(session: &dyn InitSystemSession, unit: &UnitName) -> Result<bool> {
    let state = session.unit_property(unit, UNIT_FILE_STATE).await?;
    Ok(matches!(state.as_str(), "enabled" | "enabled-runtime"))
}
