//! Agent configuration loaded from a single YAML file
//!
//! ```yaml
//! runtime_dir: /run/nodeagent
//! ready_timeout_secs: 120
//! components:
//!   - name: manifests
//!     type: files
//!     source: /usr/share/nodeagent/manifests
//!     destination: /var/lib/nodeagent/manifests
//!   - name: containerd
//!     type: process
//!     binary: /usr/bin/containerd
//!     args: ["--config", "/etc/nodeagent/containerd.toml"]
//!     ready:
//!       pid_file: true
//!   - name: kubelet
//!     type: systemd
//!     unit: kubelet
//! ```

use crate::domain::constants::{
    DEFAULT_READY_TIMEOUT, DEFAULT_RESPAWN_DELAY, DEFAULT_RUNTIME_DIR, DEFAULT_STOP_TIMEOUT,
};
use crate::domain::value_objects::{OutputTarget, ReadyProbe, SupervisorOptions};
use crate::domain::{DomainError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/nodeagent/agent.yaml";

/// Top-level configuration structure
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default = "default_runtime_dir")]
    pub runtime_dir: PathBuf,

    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,

    /// Registration order is start order
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentConfig {
    Process(ProcessComponentConfig),
    Systemd(SystemdComponentConfig),
    Files(FilesComponentConfig),
}

/// A binary run under the in-process supervisor
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ProcessComponentConfig {
    pub name: String,

    pub binary: PathBuf,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Only inherit agent environment variables with one of these prefixes
    #[serde(default)]
    pub inherit_env_prefixes: Option<Vec<String>>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub group: Option<String>,

    #[serde(default)]
    pub pid_file: Option<PathBuf>,

    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,

    #[serde(default = "default_respawn_delay_ms")]
    pub respawn_delay_ms: u64,

    #[serde(default)]
    pub stdout: Option<String>,

    #[serde(default)]
    pub stderr: Option<String>,

    #[serde(default)]
    pub ready: Option<ReadyConfig>,
}

/// Readiness probe as written in YAML
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadyConfig {
    Tcp(String),
    /// Command followed by its arguments
    Exec(Vec<String>),
    /// `pid_file: true` probes the component's own pid file
    PidFile(bool),
}

/// A unit owned by the host init system
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct SystemdComponentConfig {
    pub name: String,

    pub unit: String,

    #[serde(default = "default_true")]
    pub ready_when_active: bool,
}

/// Assets copied into place during init
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct FilesComponentConfig {
    pub name: String,

    pub source: PathBuf,

    pub destination: PathBuf,
}

fn default_runtime_dir() -> PathBuf {
    PathBuf::from(DEFAULT_RUNTIME_DIR)
}

fn default_ready_timeout_secs() -> u64 {
    DEFAULT_READY_TIMEOUT.as_secs()
}

fn default_stop_timeout_secs() -> u64 {
    DEFAULT_STOP_TIMEOUT.as_secs()
}

fn default_respawn_delay_ms() -> u64 {
    DEFAULT_RESPAWN_DELAY.as_millis() as u64
}

fn default_true() -> bool {
    true
}

impl AgentConfig {
    /// Load and validate configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DomainError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&contents)
            .map_err(|e| DomainError::InvalidConfig(format!("{}: {e}", path.display())))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AgentConfig = serde_yaml::from_str(contents)
            .map_err(|e| DomainError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.ready_timeout_secs == 0 {
            return Err(invalid("ready_timeout_secs must be positive"));
        }

        let mut seen = HashSet::new();
        for component in &self.components {
            let name = component.name();
            if name.trim().is_empty() {
                return Err(invalid("component name must not be empty"));
            }
            if !seen.insert(name) {
                return Err(invalid(format!("duplicate component name '{name}'")));
            }
            component.validate()?;
        }
        Ok(())
    }
}

impl ComponentConfig {
    pub fn name(&self) -> &str {
        match self {
            ComponentConfig::Process(c) => &c.name,
            ComponentConfig::Systemd(c) => &c.name,
            ComponentConfig::Files(c) => &c.name,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            ComponentConfig::Process(c) => {
                if c.binary.as_os_str().is_empty() {
                    return Err(invalid(format!("{}: binary must not be empty", c.name)));
                }
                if let Some(ReadyConfig::Exec(cmd)) = &c.ready
                    && cmd.is_empty()
                {
                    return Err(invalid(format!("{}: exec probe needs a command", c.name)));
                }
                if let Some(ReadyConfig::Tcp(addr)) = &c.ready
                    && addr.is_empty()
                {
                    return Err(invalid(format!("{}: tcp probe needs an address", c.name)));
                }
            }
            ComponentConfig::Systemd(c) => {
                if c.unit.trim().is_empty() {
                    return Err(invalid(format!("{}: unit must not be empty", c.name)));
                }
            }
            ComponentConfig::Files(c) => {
                if c.source.as_os_str().is_empty() || c.destination.as_os_str().is_empty() {
                    return Err(invalid(format!(
                        "{}: source and destination are required",
                        c.name
                    )));
                }
            }
        }
        Ok(())
    }
}

impl ProcessComponentConfig {
    pub fn pid_file_path(&self, runtime_dir: &Path) -> PathBuf {
        self.pid_file
            .clone()
            .unwrap_or_else(|| runtime_dir.join(format!("{}.pid", self.name)))
    }

    /// Build supervisor options, resolving user and group names
    pub fn supervisor_options(&self, runtime_dir: &Path) -> Result<SupervisorOptions> {
        let (uid, gid) = resolve_identity(self.user.as_deref(), self.group.as_deref())?;

        let mut options = SupervisorOptions::new(&self.binary, self.pid_file_path(runtime_dir))
            .args(&self.args)
            .run_as(uid, gid)
            .with_stop_timeout(Duration::from_secs(self.stop_timeout_secs))
            .with_respawn_delay(Duration::from_millis(self.respawn_delay_ms))
            .stdout(self.stdout.as_deref().map(OutputTarget::parse).unwrap_or_default())
            .stderr(self.stderr.as_deref().map(OutputTarget::parse).unwrap_or_default());

        for (key, value) in &self.env {
            options = options.env(key, value);
        }
        if let Some(prefixes) = &self.inherit_env_prefixes {
            options = options.inherit_env_prefixes(prefixes);
        }
        Ok(options)
    }

    pub fn ready_probe(&self, runtime_dir: &Path) -> Option<ReadyProbe> {
        match self.ready.as_ref()? {
            ReadyConfig::Tcp(addr) => Some(ReadyProbe::Tcp(addr.clone())),
            ReadyConfig::Exec(cmd) => {
                let (command, args) = cmd.split_first()?;
                Some(ReadyProbe::Exec {
                    command: command.clone(),
                    args: args.to_vec(),
                })
            }
            ReadyConfig::PidFile(true) => Some(ReadyProbe::PidFile(self.pid_file_path(runtime_dir))),
            ReadyConfig::PidFile(false) => None,
        }
    }
}

fn invalid(msg: impl Into<String>) -> DomainError {
    DomainError::InvalidConfig(msg.into())
}

/// Resolve user/group names (or numeric ids) to uid/gid
///
/// A user without an explicit group runs with the user's primary group.
#[cfg(unix)]
fn resolve_identity(user: Option<&str>, group: Option<&str>) -> Result<(Option<u32>, Option<u32>)> {
    use nix::unistd::{Group, User};

    let mut uid = None;
    let mut gid = None;

    if let Some(user) = user {
        if let Ok(id) = user.parse::<u32>() {
            uid = Some(id);
        } else {
            let entry = User::from_name(user)
                .map_err(|e| invalid(format!("looking up user '{user}': {e}")))?
                .ok_or_else(|| invalid(format!("unknown user '{user}'")))?;
            uid = Some(entry.uid.as_raw());
            gid = Some(entry.gid.as_raw());
        }
    }

    if let Some(group) = group {
        if let Ok(id) = group.parse::<u32>() {
            gid = Some(id);
        } else {
            let entry = Group::from_name(group)
                .map_err(|e| invalid(format!("looking up group '{group}': {e}")))?
                .ok_or_else(|| invalid(format!("unknown group '{group}'")))?;
            gid = Some(entry.gid.as_raw());
        }
    }

    Ok((uid, gid))
}

#[cfg(not(unix))]
fn resolve_identity(user: Option<&str>, group: Option<&str>) -> Result<(Option<u32>, Option<u32>)> {
    if user.is_some() || group.is_some() {
        return Err(invalid("user/group are only supported on unix"));
    }
    Ok((None, None))
}
