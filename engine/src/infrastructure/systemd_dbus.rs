//! systemd over the D-Bus system bus

use crate::domain::ports::{InitSystem, InitSystemSession};
use crate::domain::value_objects::{JobKind, JobMode, JobResult, UnitName};
use crate::domain::{DomainError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;
use zbus::Connection;
use zbus::proxy::CacheProperties;
use zbus::zvariant::OwnedObjectPath;

#[zbus::proxy(
    interface = "org.freedesktop.systemd1.Manager",
    default_service = "org.freedesktop.systemd1",
    default_path = "/org/freedesktop/systemd1",
    gen_blocking = false
)]
trait Manager {
    fn start_unit(&self, name: &str, mode: &str) -> zbus::Result<OwnedObjectPath>;

    fn stop_unit(&self, name: &str, mode: &str) -> zbus::Result<OwnedObjectPath>;

    fn restart_unit(&self, name: &str, mode: &str) -> zbus::Result<OwnedObjectPath>;

    fn load_unit(&self, name: &str) -> zbus::Result<OwnedObjectPath>;

    fn enable_unit_files(
        &self,
        files: &[&str],
        runtime: bool,
        force: bool,
    ) -> zbus::Result<(bool, Vec<(String, String, String)>)>;

    fn disable_unit_files(
        &self,
        files: &[&str],
        runtime: bool,
    ) -> zbus::Result<Vec<(String, String, String)>>;

    fn reload(&self) -> zbus::Result<()>;

    fn subscribe(&self) -> zbus::Result<()>;

    #[zbus(signal)]
    fn job_removed(
        &self,
        id: u32,
        job: zbus::zvariant::ObjectPath<'_>,
        unit: &str,
        result: &str,
    ) -> zbus::Result<()>;
}

#[zbus::proxy(
    interface = "org.freedesktop.systemd1.Unit",
    default_service = "org.freedesktop.systemd1",
    gen_blocking = false
)]
trait Unit {
    #[zbus(property)]
    fn active_state(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn sub_state(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn load_state(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn unit_file_state(&self) -> zbus::Result<String>;
}

fn bus_error(context: &'static str) -> impl FnOnce(zbus::Error) -> DomainError {
    move |e| DomainError::InitSystem(format!("{context}: {e}"))
}

/// Opens a fresh system-bus connection for each session
#[derive(Default)]
pub struct SystemdBus;

impl SystemdBus {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InitSystem for SystemdBus {
    async fn connect(&self) -> Result<Box<dyn InitSystemSession>> {
        let conn = Connection::system()
            .await
            .map_err(bus_error("connecting to the system bus"))?;
        let manager = ManagerProxy::new(&conn)
            .await
            .map_err(bus_error("creating systemd manager proxy"))?;
        // systemd only emits JobRemoved to subscribed clients
        manager
            .subscribe()
            .await
            .map_err(bus_error("subscribing to systemd signals"))?;

        Ok(Box::new(SystemdSession { conn, manager }))
    }
}

pub struct SystemdSession {
    conn: Connection,
    manager: ManagerProxy<'static>,
}

impl SystemdSession {
    async fn unit_proxy(&self, unit: &UnitName) -> Result<UnitProxy<'static>> {
        let path = self
            .manager
            .load_unit(unit.as_str())
            .await
            .map_err(bus_error("loading unit"))?;
        UnitProxy::builder(&self.conn)
            .path(path)
            .map_err(bus_error("building unit proxy"))?
            .cache_properties(CacheProperties::No)
            .build()
            .await
            .map_err(bus_error("building unit proxy"))
    }
}

#[async_trait]
impl InitSystemSession for SystemdSession {
    async fn enable_unit_files(&self, units: &[UnitName]) -> Result<()> {
        let files: Vec<&str> = units.iter().map(UnitName::as_str).collect();
        let (_, changes) = self
            .manager
            .enable_unit_files(&files, false, true)
            .await
            .map_err(bus_error("enabling unit files"))?;
        for (kind, path, target) in changes {
            debug!(change = %kind, path = %path, target = %target, "Unit file change");
        }
        Ok(())
    }

    async fn disable_unit_files(&self, units: &[UnitName]) -> Result<()> {
        let files: Vec<&str> = units.iter().map(UnitName::as_str).collect();
        let changes = self
            .manager
            .disable_unit_files(&files, false)
            .await
            .map_err(bus_error("disabling unit files"))?;
        for (kind, path, target) in changes {
            debug!(change = %kind, path = %path, target = %target, "Unit file change");
        }
        Ok(())
    }

    async fn submit_job(&self, kind: JobKind, unit: &UnitName, mode: JobMode) -> Result<JobResult> {
        // Listen before submitting so the completion signal cannot be missed
        let mut removed = self
            .manager
            .receive_job_removed()
            .await
            .map_err(bus_error("listening for job completion"))?;

        let name = unit.as_str();
        let job = match kind {
            JobKind::Start => self.manager.start_unit(name, mode.as_str()).await,
            JobKind::Stop => self.manager.stop_unit(name, mode.as_str()).await,
            JobKind::Restart => self.manager.restart_unit(name, mode.as_str()).await,
        }
        .map_err(|e| DomainError::InitSystem(format!("{kind} {unit}: {e}")))?;
        debug!(unit = %unit, job = %job.as_str(), kind = %kind, "Job queued");

        while let Some(signal) = removed.next().await {
            let args = signal
                .args()
                .map_err(bus_error("decoding JobRemoved signal"))?;
            if args.job().as_str() != job.as_str() {
                continue;
            }
            let result = JobResult::parse(args.result());
            debug!(unit = %unit, job = %job.as_str(), result = %result, "Job finished");
            return Ok(result);
        }

        Err(DomainError::InitSystem(format!(
            "bus closed before {kind} job for {unit} completed"
        )))
    }

    async fn unit_property(&self, unit: &UnitName, property: &str) -> Result<String> {
        let proxy = self.unit_proxy(unit).await?;
        let value = match property {
            "ActiveState" => proxy.active_state().await,
            "SubState" => proxy.sub_state().await,
            "LoadState" => proxy.load_state().await,
            "UnitFileState" => proxy.unit_file_state().await,
            other => {
                return Err(DomainError::InitSystem(format!(
                    "unsupported unit property {other}"
                )));
            }
        };
        value.map_err(|e| DomainError::InitSystem(format!("reading {property} of {unit}: {e}")))
    }

    async fn unit_exists(&self, unit: &UnitName) -> Result<bool> {
        let proxy = self.unit_proxy(unit).await?;
        let state = proxy
            .load_state()
            .await
            .map_err(bus_error("reading LoadState"))?;
        Ok(state != "not-found")
    }

    async fn reload(&self) -> Result<()> {
        self.manager
            .reload()
            .await
            .map_err(bus_error("reloading unit files"))
    }
}
