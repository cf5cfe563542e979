#![allow(dead_code)]

use nodeagent_engine::domain::ports::ProcessTable;
use nodeagent_engine::domain::value_objects::{OutputTarget, SupervisorOptions};
use nodeagent_engine::infrastructure::HostProcessTable;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const SHELL: &str = "/bin/sh";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn host_table() -> Arc<dyn ProcessTable> {
    Arc::new(HostProcessTable::new())
}

/// Write a shell script into `dir` and return its path.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
    path
}

/// Supervisor options running `script` under `/bin/sh`, so the command
/// line of the child always starts with the shell path.
pub fn script_options(dir: &Path, script: &Path) -> SupervisorOptions {
    SupervisorOptions::new(SHELL, dir.join("run").join("child.pid"))
        .args([script.display().to_string()])
        .stdout(OutputTarget::Null)
        .stderr(OutputTarget::Null)
        .with_respawn_delay(Duration::from_millis(100))
        .with_stop_timeout(Duration::from_secs(2))
}

pub fn count_lines(path: &Path) -> usize {
    std::fs::read_to_string(path)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}

pub fn pid_is_alive(pid: u32) -> bool {
    HostProcessTable::new().is_running(pid).unwrap_or(false)
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn wait_until<F: FnMut() -> bool>(mut condition: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
