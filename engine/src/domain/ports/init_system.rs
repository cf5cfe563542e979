//! InitSystem port
//! Interface to the host init system's IPC bus
//!
//! Each `connect` opens a fresh session; the unit controller opens one per
//! public call and drops it before returning, so no connection outlives a
//! single operation.

use crate::domain::Result;
use crate::domain::value_objects::{JobKind, JobMode, JobResult, UnitName};
use async_trait::async_trait;

#[async_trait]
pub trait InitSystem: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn InitSystemSession>>;
}

/// One open connection to the init system
#[async_trait]
pub trait InitSystemSession: Send + Sync {
    /// Enable unit files so the units start on boot
    async fn enable_unit_files(&self, units: &[UnitName]) -> Result<()>;

    async fn disable_unit_files(&self, units: &[UnitName]) -> Result<()>;

    /// Submit a job and wait for its completion signal. Resolves exactly once
    /// with the terminal result reported by the init system.
    async fn submit_job(&self, kind: JobKind, unit: &UnitName, mode: JobMode)
    -> Result<JobResult>;

    /// Read a string property of the unit (e.g. `ActiveState`)
    async fn unit_property(&self, unit: &UnitName, property: &str) -> Result<String>;

    /// Look the unit up by name
    async fn unit_exists(&self, unit: &UnitName) -> Result<bool>;

    /// Reload unit definitions from disk
    async fn reload(&self) -> Result<()>;
}
