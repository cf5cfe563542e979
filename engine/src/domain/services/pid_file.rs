//! Pid file bookkeeping
//!
//! A pid file holds the decimal pid of the supervised child, nothing else.
//! Its presence means a child is believed to be running.

use crate::domain::{DomainError, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Contents of a pid file on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PidFileState {
    Missing,
    Pid(u32),
    /// Present but not a positive decimal pid
    Malformed,
}

pub fn read(path: &Path) -> Result<PidFileState> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(PidFileState::Missing),
        Err(e) => return Err(DomainError::setup(format!("reading pid file {}", path.display()), e)),
    };

    match contents.trim().parse::<u32>() {
        Ok(pid) if pid > 0 => Ok(PidFileState::Pid(pid)),
        _ => {
            warn!(pidfile = %path.display(), "Pid file does not contain a valid pid");
            Ok(PidFileState::Malformed)
        }
    }
}

pub fn write(path: &Path, pid: u32) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| DomainError::setup(format!("creating pid file {}", path.display()), e))?;

    write!(file, "{pid}")
        .map_err(|e| DomainError::setup(format!("writing pid file {}", path.display()), e))?;

    debug!(pidfile = %path.display(), pid = pid, "Wrote pid file");
    Ok(())
}

/// Remove the pid file; a missing file is not an error
pub fn remove(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(pidfile = %path.display(), "Removed pid file");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DomainError::setup(format!("removing pid file {}", path.display()), e)),
    }
}

/// Create the directory the pid file lives in
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(dir)
        .map_err(|e| DomainError::setup(format!("creating run directory {}", dir.display()), e))
}
