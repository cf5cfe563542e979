//! Ready probe executor
//! Performs TCP, Exec and pid-file readiness probes

use crate::domain::ports::{ProcessTable, ReadyCheck};
use crate::domain::services::pid_file::{self, PidFileState};
use crate::domain::value_objects::ReadyProbe;
use crate::domain::{DomainError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Upper bound for a single probe attempt
pub const PROBE_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ProbeExecutor {
    component: String,
    probe: ReadyProbe,
    table: Arc<dyn ProcessTable>,
    attempt_timeout: Duration,
}

impl ProbeExecutor {
    pub fn new(component: impl Into<String>, probe: ReadyProbe, table: Arc<dyn ProcessTable>) -> Self {
        Self {
            component: component.into(),
            probe,
            table,
            attempt_timeout: PROBE_ATTEMPT_TIMEOUT,
        }
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn probe(&self) -> &ReadyProbe {
        &self.probe
    }

    fn not_ready(&self, reason: impl std::fmt::Display) -> DomainError {
        DomainError::component(&self.component, format!("{} not ready: {reason}", self.probe))
    }

    async fn tcp(&self, addr: &str) -> Result<()> {
        match tokio::time::timeout(self.attempt_timeout, tokio::net::TcpStream::connect(addr)).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(self.not_ready(e)),
            Err(_) => Err(self.not_ready("connect timed out")),
        }
    }

    async fn exec(&self, command: &str, args: &[String]) -> Result<()> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(self.attempt_timeout, cmd.status()).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => Err(self.not_ready(format!("exited with {status}"))),
            Ok(Err(e)) => Err(self.not_ready(e)),
            Err(_) => Err(self.not_ready("command timed out")),
        }
    }

    fn pid_file(&self, path: &Path) -> Result<()> {
        match pid_file::read(path)? {
            PidFileState::Pid(pid) if self.table.is_running(pid)? => Ok(()),
            PidFileState::Pid(pid) => Err(self.not_ready(format!("pid {pid} is not running"))),
            PidFileState::Missing => Err(self.not_ready("pid file missing")),
            PidFileState::Malformed => Err(self.not_ready("pid file malformed")),
        }
    }
}

#[async_trait]
impl ReadyCheck for ProbeExecutor {
    async fn ready(&self) -> Result<()> {
        debug!(component = %self.component, probe = %self.probe, "Running ready probe");
        match &self.probe {
            ReadyProbe::Tcp(addr) => self.tcp(addr).await,
            ReadyProbe::Exec { command, args } => self.exec(command, args).await,
            ReadyProbe::PidFile(path) => self.pid_file(path),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::infrastructure::HostProcessTable;

    fn executor(probe: ReadyProbe) -> ProbeExecutor {
        ProbeExecutor::new("engine", probe, Arc::new(HostProcessTable::new()))
            .with_attempt_timeout(Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_tcp_probe_success() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
        });

        executor(ReadyProbe::Tcp(addr.to_string())).ready().await.unwrap();
    }

    #[tokio::test]
    async fn test_tcp_probe_failure_names_component() {
        let err = executor(ReadyProbe::Tcp("127.0.0.1:9".to_string()))
            .ready()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("engine"), "{err}");
    }

    #[tokio::test]
    async fn test_exec_probe() {
        executor(ReadyProbe::Exec {
            command: "true".to_string(),
            args: vec![],
        })
        .ready()
        .await
        .unwrap();

        let err = executor(ReadyProbe::Exec {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "exit 4".to_string()],
        })
        .ready()
        .await
        .unwrap_err();
        assert!(err.to_string().contains("exited"), "{err}");
    }

    #[tokio::test]
    async fn test_pid_file_probe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.pid");
        let probe = executor(ReadyProbe::PidFile(path.clone()));

        assert!(probe.ready().await.is_err());

        pid_file::write(&path, std::process::id()).unwrap();
        probe.ready().await.unwrap();
    }
}
