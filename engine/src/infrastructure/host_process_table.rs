//! Host process table backed by `kill(2)` and procfs

use crate::domain::ports::ProcessTable;
use crate::domain::value_objects::{SignalDelivery, TerminationSignal};
use crate::domain::{DomainError, Result};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

const PROC_ROOT: &str = "/proc";

pub struct HostProcessTable {
    proc_root: PathBuf,
}

impl HostProcessTable {
    pub fn new() -> Self {
        Self {
            proc_root: PathBuf::from(PROC_ROOT),
        }
    }

    /// Read process information from another procfs mount (e.g. `/host/proc`)
    pub fn with_proc_root(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    /// A zombie still answers `kill(pid, 0)` but is not running anymore
    fn is_zombie(&self, pid: u32) -> bool {
        let Ok(stat) = fs::read_to_string(self.proc_root.join(pid.to_string()).join("stat")) else {
            return false;
        };
        // The state field follows the parenthesized command name, which may
        // itself contain spaces or parentheses.
        stat.rfind(')')
            .and_then(|i| stat[i + 1..].split_whitespace().next())
            .is_some_and(|state| state == "Z" || state == "X")
    }
}

impl Default for HostProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

fn to_pid(pid: u32) -> Result<Pid> {
    i32::try_from(pid)
        .ok()
        .filter(|p| *p > 0)
        .map(Pid::from_raw)
        .ok_or_else(|| DomainError::Signal {
            pid,
            signal: "none".to_string(),
            reason: "pid out of range".to_string(),
        })
}

impl ProcessTable for HostProcessTable {
    fn signal(&self, pid: u32, signal: TerminationSignal) -> Result<SignalDelivery> {
        let sig = match signal {
            TerminationSignal::Terminate => Signal::SIGTERM,
            TerminationSignal::Kill => Signal::SIGKILL,
        };
        match signal::kill(to_pid(pid)?, sig) {
            Ok(()) => Ok(SignalDelivery::Delivered),
            Err(Errno::ESRCH) => Ok(SignalDelivery::NoSuchProcess),
            Err(e) => Err(DomainError::Signal {
                pid,
                signal: signal.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn is_running(&self, pid: u32) -> Result<bool> {
        match signal::kill(to_pid(pid)?, None) {
            // EPERM: exists but belongs to someone else
            Ok(()) | Err(Errno::EPERM) => Ok(!self.is_zombie(pid)),
            Err(Errno::ESRCH) => Ok(false),
            Err(e) => Err(DomainError::Signal {
                pid,
                signal: "0".to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn command_line(&self, pid: u32) -> Result<Option<Vec<String>>> {
        let path = self.proc_root.join(pid.to_string()).join("cmdline");
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            // The process exited while we were reading
            Err(e) if e.raw_os_error() == Some(Errno::ESRCH as i32) => return Ok(None),
            Err(e) => return Err(DomainError::setup(format!("reading {}", path.display()), e)),
        };

        let cmdline = String::from_utf8_lossy(&raw);
        // Kernel threads and zombies have an empty command line
        let args: Vec<String> = cmdline
            .trim_end_matches('\0')
            .split_terminator('\0')
            .map(str::to_string)
            .collect();
        if args.is_empty() {
            return Ok(None);
        }
        Ok(Some(args))
    }
}
