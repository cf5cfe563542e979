//! Domain errors
//!
//! A single error enum shared by every layer of the engine. Variants follow
//! the failure classes the agent distinguishes: setup failures are fatal and
//! never retried, component failures carry the failing component's name,
//! teardown failures are aggregated, and init-system job failures carry the
//! terminal job result.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Cannot prepare on-disk state (run directory, pid file, staged files)
    #[error("setup failed: {0}")]
    Setup(String),

    /// Cannot exec the supervised binary
    #[error("failed to spawn {binary}: {reason}")]
    Spawn { binary: String, reason: String },

    /// Cannot deliver a termination signal
    #[error("failed to send {signal} to pid {pid}: {reason}")]
    Signal {
        pid: u32,
        signal: String,
        reason: String,
    },

    /// Error reported by a component body
    #[error("component {component}: {reason}")]
    ComponentFailed { component: String, reason: String },

    /// A component's start returned an error; started components were rolled back
    #[error("failed to start component {component}: {source}")]
    StartFailed {
        component: String,
        #[source]
        source: Box<DomainError>,
    },

    /// A component's ready check never succeeded; started components were rolled back
    #[error("component {component} health check timed out after {timeout:?}: {last_error}")]
    ReadinessTimeout {
        component: String,
        timeout: Duration,
        last_error: String,
    },

    /// One or more components failed to stop
    #[error("failed to stop {}", StopErrors(.0))]
    StopFailed(Vec<ComponentError>),

    /// Init-system bus or method failure
    #[error("init system: {0}")]
    InitSystem(String),

    /// An init-system job finished with a result other than "done"
    #[error("{job} job for unit {unit} finished with result {result}")]
    JobFailed {
        unit: String,
        job: String,
        result: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("cancelled: {0}")]
    Cancelled(String),
}

/// Error attributed to a single named component
#[derive(Debug)]
pub struct ComponentError {
    pub component: String,
    pub error: DomainError,
}

impl fmt::Display for ComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.component, self.error)
    }
}

struct StopErrors<'a>(&'a [ComponentError]);

impl fmt::Display for StopErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl DomainError {
    pub fn component(component: impl Into<String>, reason: impl fmt::Display) -> Self {
        DomainError::ComponentFailed {
            component: component.into(),
            reason: reason.to_string(),
        }
    }

    pub fn setup(context: impl fmt::Display, err: impl fmt::Display) -> Self {
        DomainError::Setup(format!("{context}: {err}"))
    }
}
