//! Process Supervisor
//!
//! Owns exactly one external binary invocation:
//! - `supervise` takes over (kills) a leftover instance recorded in the pid
//!   file, then launches a monitoring task that starts the child and
//!   restarts it after a fixed delay whenever it exits
//! - `stop` cancels the monitoring task, which terminates the child with
//!   SIGTERM escalating to SIGKILL, and waits for the task to finish
//!
//! The pid file exists while a child is running under this supervisor.
//! Respawning has no backoff growth and no restart ceiling.

use crate::domain::constants::KILL_REAP_TIMEOUT;
use crate::domain::ports::ProcessTable;
use crate::domain::services::pid_file::{self, PidFileState};
use crate::domain::services::termination::kill_pid;
use crate::domain::value_objects::{OutputTarget, SupervisorOptions};
use crate::domain::{DomainError, Result};
use std::fs::{File, OpenOptions};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct Supervisor {
    name: String,
    options: SupervisorOptions,
    table: Arc<dyn ProcessTable>,
    /// Serializes supervise/stop and holds the active monitoring run
    run: Mutex<Option<MonitorRun>>,
    current_pid: Arc<AtomicU32>,
    restarts: Arc<AtomicU64>,
}

struct MonitorRun {
    token: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl Supervisor {
    pub fn new(name: impl Into<String>, options: SupervisorOptions, table: Arc<dyn ProcessTable>) -> Self {
        Self {
            name: name.into(),
            options,
            table,
            run: Mutex::new(None),
            current_pid: Arc::new(AtomicU32::new(0)),
            restarts: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &SupervisorOptions {
        &self.options
    }

    /// Pid of the child currently running under this supervisor
    pub fn pid(&self) -> Option<u32> {
        match self.current_pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    /// How many times the child has been started again after exiting
    pub fn restart_count(&self) -> u64 {
        self.restarts.load(Ordering::SeqCst)
    }

    pub async fn is_supervising(&self) -> bool {
        self.run
            .lock()
            .await
            .as_ref()
            .is_some_and(|r| !r.task.is_finished())
    }

    /// Start supervising the binary
    ///
    /// Returns once the first start has been attempted. Calling it while a
    /// monitoring task is already active is a no-op.
    pub async fn supervise(&self) -> Result<()> {
        let mut run = self.run.lock().await;

        if run.as_ref().is_some_and(|r| !r.task.is_finished()) {
            debug!(supervisor = %self.name, "Already supervising");
            return Ok(());
        }
        if let Some(finished) = run.take()
            && let Ok(Err(e)) = finished.task.await
        {
            warn!(supervisor = %self.name, error = %e, "Previous monitoring run had failed");
        }

        pid_file::ensure_parent_dir(self.options.pid_file())?;
        let stdout = ChildOutput::open(self.options.stdout_target())?;
        let stderr = ChildOutput::open(self.options.stderr_target())?;
        self.take_over_leftover().await?;

        let token = CancellationToken::new();
        let (first_tx, first_rx) = oneshot::channel();
        let monitor = Monitor {
            name: self.name.clone(),
            options: self.options.clone(),
            table: Arc::clone(&self.table),
            token: token.clone(),
            current_pid: Arc::clone(&self.current_pid),
            restarts: Arc::clone(&self.restarts),
            stdout,
            stderr,
        };
        let task = tokio::spawn(monitor.run(first_tx));

        match first_rx.await {
            Ok(Ok(())) => {
                *run = Some(MonitorRun { token, task });
                Ok(())
            }
            Ok(Err(e)) => {
                token.cancel();
                let _ = task.await;
                Err(e)
            }
            Err(_) => {
                token.cancel();
                match task.await {
                    Ok(Err(e)) => Err(e),
                    _ => Err(DomainError::component(
                        &self.name,
                        "monitoring task exited before the first start",
                    )),
                }
            }
        }
    }

    /// Stop supervising: terminate the child and wait for the monitoring
    /// task to exit. Calling it when not supervising is a no-op.
    pub async fn stop(&self) -> Result<()> {
        let mut run = self.run.lock().await;
        let Some(current) = run.take() else {
            return Ok(());
        };

        info!(supervisor = %self.name, "Stopping supervised process");
        current.token.cancel();
        match current.task.await {
            Ok(result) => result,
            Err(e) => Err(DomainError::component(
                &self.name,
                format!("monitoring task failed: {e}"),
            )),
        }
    }

    /// Kill a process left behind by a previous agent instance
    ///
    /// Only a process whose command line starts with our binary is killed, so
    /// a reused pid belonging to something else is left alone.
    async fn take_over_leftover(&self) -> Result<()> {
        let path = self.options.pid_file();
        let pid = match pid_file::read(path)? {
            PidFileState::Missing => return Ok(()),
            PidFileState::Malformed => return pid_file::remove(path),
            PidFileState::Pid(pid) => pid,
        };

        match self.table.command_line(pid)? {
            Some(cmdline) if self.is_our_binary(&cmdline) => {
                warn!(
                    supervisor = %self.name,
                    pid = pid,
                    "Found leftover supervised process, terminating it"
                );
                kill_pid(self.table.as_ref(), pid, self.options.stop_timeout()).await?;
            }
            Some(cmdline) => {
                info!(
                    supervisor = %self.name,
                    pid = pid,
                    cmdline = %cmdline.join(" "),
                    "Pid file points at an unrelated process, ignoring it"
                );
            }
            None => debug!(supervisor = %self.name, pid = pid, "Stale pid file"),
        }
        pid_file::remove(path)
    }

    fn is_our_binary(&self, cmdline: &[String]) -> bool {
        cmdline
            .first()
            .is_some_and(|argv0| std::path::Path::new(argv0) == self.options.binary())
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Ok(mut run) = self.run.try_lock()
            && let Some(current) = run.take()
        {
            current.token.cancel();
        }
    }
}

/// State moved into the monitoring task
struct Monitor {
    name: String,
    options: SupervisorOptions,
    table: Arc<dyn ProcessTable>,
    token: CancellationToken,
    current_pid: Arc<AtomicU32>,
    restarts: Arc<AtomicU64>,
    stdout: ChildOutput,
    stderr: ChildOutput,
}

enum Wake {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
}

impl Monitor {
    async fn run(self, first_tx: oneshot::Sender<Result<()>>) -> Result<()> {
        let mut first = Some(first_tx);

        loop {
            match self.spawn() {
                Ok(mut child) => {
                    let pid = child.id().unwrap_or(0);
                    if let Err(e) = pid_file::write(self.options.pid_file(), pid) {
                        error!(supervisor = %self.name, error = %e, "Cannot record pid, giving up");
                        if let Err(te) = self.terminate(&mut child, pid).await {
                            warn!(supervisor = %self.name, error = %te, "Failed to terminate child");
                        }
                        return match first.take() {
                            Some(tx) => {
                                let _ = tx.send(Err(e));
                                Ok(())
                            }
                            None => Err(e),
                        };
                    }

                    self.current_pid.store(pid, Ordering::SeqCst);
                    info!(
                        supervisor = %self.name,
                        binary = %self.options.binary().display(),
                        "spawned (pid={pid})"
                    );
                    if let Some(tx) = first.take() {
                        let _ = tx.send(Ok(()));
                    }

                    let wake = tokio::select! {
                        status = child.wait() => Wake::Exited(status),
                        _ = self.token.cancelled() => Wake::Cancelled,
                    };

                    match wake {
                        Wake::Exited(status) => {
                            self.forget_child();
                            match status {
                                Ok(status) => warn!(
                                    supervisor = %self.name,
                                    pid = pid,
                                    status = %status,
                                    "Supervised process exited"
                                ),
                                Err(e) => error!(
                                    supervisor = %self.name,
                                    pid = pid,
                                    error = %e,
                                    "Failed to wait for supervised process"
                                ),
                            }
                        }
                        Wake::Cancelled => {
                            let result = self.terminate(&mut child, pid).await;
                            self.forget_child();
                            info!(supervisor = %self.name, pid = pid, "Supervised process stopped");
                            return result;
                        }
                    }
                }
                Err(e) => {
                    error!(supervisor = %self.name, error = %e, "Failed to start supervised process");
                    if let Some(tx) = first.take() {
                        let _ = tx.send(Ok(()));
                    }
                }
            }

            tokio::select! {
                _ = self.token.cancelled() => {
                    debug!(supervisor = %self.name, "Respawn cancelled");
                    return Ok(());
                }
                _ = sleep(self.options.respawn_delay()) => {}
            }
            self.restarts.fetch_add(1, Ordering::SeqCst);
            info!(supervisor = %self.name, "Respawning supervised process");
        }
    }

    fn spawn(&self) -> Result<Child> {
        let opts = &self.options;
        let mut cmd = Command::new(opts.binary());
        cmd.args(opts.arguments());
        cmd.env_clear();
        cmd.envs(opts.child_environment(std::env::vars()));
        cmd.stdin(Stdio::null());
        cmd.stdout(self.stdout.stdio().map_err(|e| self.spawn_error(e))?);
        cmd.stderr(self.stderr.stdio().map_err(|e| self.spawn_error(e))?);

        #[cfg(unix)]
        {
            // Own process group: signals aimed at the agent do not reach the child.
            cmd.process_group(0);
            if nix::unistd::geteuid().is_root() {
                if let Some(gid) = opts.gid() {
                    cmd.gid(gid);
                }
                if let Some(uid) = opts.uid() {
                    cmd.uid(uid);
                }
            } else if opts.uid().is_some() || opts.gid().is_some() {
                debug!(supervisor = %self.name, "Not privileged, ignoring run-as user/group");
            }
        }

        cmd.spawn().map_err(|e| self.spawn_error(e))
    }

    fn spawn_error(&self, e: std::io::Error) -> DomainError {
        DomainError::Spawn {
            binary: self.options.binary().display().to_string(),
            reason: e.to_string(),
        }
    }

    /// Escalating termination of our own child, reaping it afterwards
    async fn terminate(&self, child: &mut Child, pid: u32) -> Result<()> {
        tokio::select! {
            status = child.wait() => {
                debug!(supervisor = %self.name, pid = pid, status = ?status, "Child exited");
                return Ok(());
            }
            result = kill_pid(self.table.as_ref(), pid, self.options.stop_timeout()) => result?,
        }

        if timeout(KILL_REAP_TIMEOUT, child.wait()).await.is_err() {
            warn!(supervisor = %self.name, pid = pid, "Still running after SIGKILL, giving up");
        }
        Ok(())
    }

    fn forget_child(&self) {
        self.current_pid.store(0, Ordering::SeqCst);
        if let Err(e) = pid_file::remove(self.options.pid_file()) {
            warn!(supervisor = %self.name, error = %e, "Failed to remove pid file");
        }
    }
}

/// Child stdout/stderr, with files opened once when supervision begins
enum ChildOutput {
    Inherit,
    Null,
    File(File),
}

impl ChildOutput {
    fn open(target: &OutputTarget) -> Result<Self> {
        match target {
            OutputTarget::Inherit => Ok(ChildOutput::Inherit),
            OutputTarget::Null => Ok(ChildOutput::Null),
            OutputTarget::File(path) => OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map(ChildOutput::File)
                .map_err(|e| DomainError::setup(format!("opening output file {}", path.display()), e)),
        }
    }

    fn stdio(&self) -> std::io::Result<Stdio> {
        match self {
            ChildOutput::Inherit => Ok(Stdio::inherit()),
            ChildOutput::Null => Ok(Stdio::null()),
            ChildOutput::File(file) => file.try_clone().map(Stdio::from),
        }
    }
}
