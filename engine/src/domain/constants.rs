//! Domain Constants
//!
//! Defaults shared by the lifecycle manager, the supervisor and the unit controller

use std::time::Duration;

/// How long `ComponentManager::start` waits for a component's ready check
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(120);

/// Interval between two ready checks
pub const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Time a supervised process gets between the first SIGTERM and SIGKILL
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay before a crashed supervised process is started again
pub const DEFAULT_RESPAWN_DELAY: Duration = Duration::from_secs(5);

/// SIGTERM is repeated at this interval until the stop timeout elapses
pub const TERMINATE_INTERVAL: Duration = Duration::from_secs(1);

/// How long to wait for a process to be reaped after SIGKILL
pub const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default directory for pid files
pub const DEFAULT_RUNTIME_DIR: &str = "/run/nodeagent";

/// Suffix every systemd service unit name carries
pub const SERVICE_SUFFIX: &str = ".service";

/// Directory the install workflow writes unit files into
pub const DEFAULT_UNIT_DIR: &str = "/etc/systemd/system";
