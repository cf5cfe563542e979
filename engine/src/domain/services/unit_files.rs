//! Unit file writer
//!
//! Writes service unit files and drop-in fragments for the install/upgrade
//! workflow. Writers report whether anything changed on disk so callers
//! only reload the init system when needed.

use crate::domain::constants::DEFAULT_UNIT_DIR;
use crate::domain::value_objects::UnitName;
use crate::domain::{DomainError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Placeholder replaced by the binary path when rendering a unit template
pub const EXE_PATH_PLACEHOLDER: &str = "%exe_path%";

pub struct UnitFileWriter {
    unit_dir: PathBuf,
}

impl Default for UnitFileWriter {
    fn default() -> Self {
        Self::new(DEFAULT_UNIT_DIR)
    }
}

impl UnitFileWriter {
    pub fn new(unit_dir: impl Into<PathBuf>) -> Self {
        Self {
            unit_dir: unit_dir.into(),
        }
    }

    pub fn unit_path(&self, unit: &UnitName) -> PathBuf {
        self.unit_dir.join(unit.as_str())
    }

    pub fn drop_in_path(&self, unit: &UnitName, name: &str) -> PathBuf {
        self.unit_dir
            .join(unit.drop_in_dir_name())
            .join(format!("{name}.conf"))
    }

    /// Write the base unit file, returning whether its content changed
    pub fn write_unit(&self, unit: &UnitName, contents: &str) -> Result<bool> {
        fs::create_dir_all(&self.unit_dir)
            .map_err(|e| DomainError::setup(format!("creating {}", self.unit_dir.display()), e))?;
        write_if_changed(&self.unit_path(unit), contents)
    }

    /// Write `<unit_dir>/<unit>.d/<name>.conf`, returning whether it changed
    pub fn write_drop_in(&self, unit: &UnitName, name: &str, contents: &str) -> Result<bool> {
        let path = self.drop_in_path(unit, name);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| DomainError::setup(format!("creating {}", dir.display()), e))?;
        }
        write_if_changed(&path, contents)
    }

    /// Remove a drop-in; the drop-in directory goes too once it is empty
    pub fn remove_drop_in(&self, unit: &UnitName, name: &str) -> Result<bool> {
        let path = self.drop_in_path(unit, name);
        let removed = remove_if_present(&path)?;
        if let Some(dir) = path.parent() {
            // Fails while other drop-ins remain, which is fine.
            let _ = fs::remove_dir(dir);
        }
        Ok(removed)
    }

    pub fn remove_unit(&self, unit: &UnitName) -> Result<bool> {
        remove_if_present(&self.unit_path(unit))
    }
}

/// Render a unit template, substituting the binary path
pub fn render_unit(template: &str, exe_path: &Path) -> String {
    template.replace(EXE_PATH_PLACEHOLDER, &exe_path.display().to_string())
}

/// Drop-in replacing the unit's `ExecStart`
///
/// systemd appends `ExecStart` lines across fragments, so the empty
/// assignment is required to clear the inherited command first.
pub fn exec_start_override(exe_path: &Path, args: &[String]) -> String {
    let mut command = exe_path.display().to_string();
    for arg in args {
        command.push(' ');
        command.push_str(arg);
    }
    format!("[Service]\nExecStart=\nExecStart={command}\n")
}

fn write_if_changed(path: &Path, contents: &str) -> Result<bool> {
    match fs::read_to_string(path) {
        Ok(existing) if existing == contents => {
            debug!(path = %path.display(), "Unit file unchanged");
            return Ok(false);
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(DomainError::setup(format!("reading {}", path.display()), e)),
    }

    fs::write(path, contents)
        .map_err(|e| DomainError::setup(format!("writing {}", path.display()), e))?;
    info!(path = %path.display(), "Wrote unit file");
    Ok(true)
}

fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "Removed unit file");
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DomainError::setup(format!("removing {}", path.display()), e)),
    }
}
