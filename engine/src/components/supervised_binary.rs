//! Component backed by the in-process supervisor

use crate::domain::ports::{Component, ReadyCheck};
use crate::domain::services::Supervisor;
use crate::domain::services::pid_file;
use crate::domain::{DomainError, Result};
use crate::infrastructure::ProbeExecutor;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub struct SupervisedBinary {
    supervisor: Supervisor,
    probe: Option<ProbeExecutor>,
}

impl SupervisedBinary {
    pub fn new(supervisor: Supervisor) -> Self {
        Self {
            supervisor,
            probe: None,
        }
    }

    pub fn with_probe(mut self, probe: ProbeExecutor) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }
}

#[async_trait]
impl Component for SupervisedBinary {
    fn name(&self) -> &str {
        self.supervisor.name()
    }

    async fn init(&self, _token: CancellationToken) -> Result<()> {
        let options = self.supervisor.options();
        let binary = options.binary();
        let metadata = tokio::fs::metadata(binary).await.map_err(|e| {
            DomainError::component(self.name(), format!("binary {}: {e}", binary.display()))
        })?;
        if !metadata.is_file() {
            return Err(DomainError::component(
                self.name(),
                format!("{} is not a regular file", binary.display()),
            ));
        }
        pid_file::ensure_parent_dir(options.pid_file())?;
        debug!(component = %self.name(), binary = %binary.display(), "Binary present");
        Ok(())
    }

    async fn start(&self, _token: CancellationToken) -> Result<()> {
        self.supervisor.supervise().await
    }

    async fn stop(&self) -> Result<()> {
        self.supervisor.stop().await
    }

    fn ready_check(&self) -> Option<&dyn ReadyCheck> {
        self.probe.as_ref().map(|p| p as &dyn ReadyCheck)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::ports::ProcessTable;
    use crate::domain::value_objects::{OutputTarget, ReadyProbe, SupervisorOptions};
    use crate::infrastructure::HostProcessTable;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_init_rejects_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let options = SupervisorOptions::new("/nonexistent/engine", dir.path().join("e.pid"));
        let component = SupervisedBinary::new(Supervisor::new(
            "engine",
            options,
            Arc::new(HostProcessTable::new()),
        ));

        let err = component.init(CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("engine"), "{err}");
    }

    #[tokio::test]
    async fn test_start_supervises_and_pid_file_probe_passes() {
        let dir = tempfile::tempdir().unwrap();
        let pid_path = dir.path().join("run").join("sleeper.pid");
        let table: Arc<dyn ProcessTable> = Arc::new(HostProcessTable::new());
        let options = SupervisorOptions::new("/bin/sh", &pid_path)
            .args(["-c", "sleep 60"])
            .stdout(OutputTarget::Null);
        let component = SupervisedBinary::new(Supervisor::new("sleeper", options, table.clone()))
            .with_probe(ProbeExecutor::new(
                "sleeper",
                ReadyProbe::PidFile(pid_path.clone()),
                table,
            ));

        let token = CancellationToken::new();
        component.init(token.clone()).await.unwrap();
        component.start(token).await.unwrap();
        component.ready_check().unwrap().ready().await.unwrap();

        component.stop().await.unwrap();
        assert!(!pid_path.exists());
        assert!(component.ready_check().unwrap().ready().await.is_err());
    }
}
