//! Infrastructure Layer
//!
//! Adapters implementing the domain ports against the host:
//!
//! - `HostProcessTable`: signals via `kill(2)`, liveness and command lines via procfs
//! - `SystemdBus`: systemd manager over the D-Bus system bus, one connection per session
//! - `ProbeExecutor`: TCP, Exec and pid-file readiness probes
//! - `AgentConfig`: YAML configuration

pub mod config;
#[cfg(unix)]
pub mod host_process_table;
pub mod ready_probe_executor;
#[cfg(unix)]
pub mod systemd_dbus;

pub use config::{AgentConfig, ComponentConfig, DEFAULT_CONFIG_PATH};
#[cfg(unix)]
pub use host_process_table::HostProcessTable;
pub use ready_probe_executor::ProbeExecutor;
#[cfg(unix)]
pub use systemd_dbus::SystemdBus;
