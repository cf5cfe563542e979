//! Readiness probe definitions

use std::fmt;
use std::path::PathBuf;

/// How a supervised component proves it is ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyProbe {
    /// A TCP connect to `host:port` succeeds
    Tcp(String),
    /// The command exits 0
    Exec { command: String, args: Vec<String> },
    /// The pid file names a live process
    PidFile(PathBuf),
}

impl fmt::Display for ReadyProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadyProbe::Tcp(addr) => write!(f, "tcp {addr}"),
            ReadyProbe::Exec { command, args } => write!(f, "exec {command} {}", args.join(" ")),
            ReadyProbe::PidFile(path) => write!(f, "pid file {}", path.display()),
        }
    }
}
