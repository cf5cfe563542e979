//! Component that stages bundled assets onto the host during init
//!
//! Files are copied only when their content differs from what is already
//! at the destination, so repeated inits leave timestamps untouched.

use crate::domain::ports::Component;
use crate::domain::{DomainError, Result};
use async_trait::async_trait;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct StagedFiles {
    name: String,
    source: PathBuf,
    destination: PathBuf,
}

impl StagedFiles {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            destination: destination.into(),
        }
    }
}

#[async_trait]
impl Component for StagedFiles {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, token: CancellationToken) -> Result<()> {
        if token.is_cancelled() {
            return Err(DomainError::Cancelled(format!("staging {}", self.name)));
        }

        let source = self.source.clone();
        let destination = self.destination.clone();
        let copied = tokio::task::spawn_blocking(move || stage(&source, &destination))
            .await
            .map_err(|e| DomainError::component(&self.name, format!("staging task failed: {e}")))??;

        info!(
            component = %self.name,
            destination = %self.destination.display(),
            copied = copied,
            "Staged files"
        );
        Ok(())
    }

    async fn start(&self, _token: CancellationToken) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

/// Copy `source` (file or directory tree) to `destination`, returning how
/// many files were written
fn stage(source: &Path, destination: &Path) -> Result<usize> {
    let metadata = fs::metadata(source)
        .map_err(|e| DomainError::setup(format!("reading {}", source.display()), e))?;

    if metadata.is_dir() {
        fs::create_dir_all(destination)
            .map_err(|e| DomainError::setup(format!("creating {}", destination.display()), e))?;
        let entries = fs::read_dir(source)
            .map_err(|e| DomainError::setup(format!("listing {}", source.display()), e))?;

        let mut copied = 0;
        for entry in entries {
            let entry = entry
                .map_err(|e| DomainError::setup(format!("listing {}", source.display()), e))?;
            copied += stage(&entry.path(), &destination.join(entry.file_name()))?;
        }
        Ok(copied)
    } else {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DomainError::setup(format!("creating {}", parent.display()), e))?;
        }
        copy_if_changed(source, destination)
    }
}

fn copy_if_changed(source: &Path, destination: &Path) -> Result<usize> {
    let wanted = fs::read(source)
        .map_err(|e| DomainError::setup(format!("reading {}", source.display()), e))?;
    match fs::read(destination) {
        Ok(existing) if existing == wanted => {
            debug!(path = %destination.display(), "Unchanged");
            return Ok(0);
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(DomainError::setup(format!("reading {}", destination.display()), e)),
    }

    fs::copy(source, destination).map_err(|e| {
        DomainError::setup(
            format!("copying {} to {}", source.display(), destination.display()),
            e,
        )
    })?;
    Ok(1)
}
