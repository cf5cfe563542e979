//! Supervisor configuration
//! Everything a supervisor needs to know about the one binary it owns

use crate::domain::constants::{DEFAULT_RESPAWN_DELAY, DEFAULT_STOP_TIMEOUT};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where a supervised process writes stdout/stderr
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    #[default]
    Inherit,
    Null,
    /// Append to this file, creating it if needed
    File(PathBuf),
}

impl OutputTarget {
    /// Parse "inherit", "null", or a file path
    pub fn parse(value: &str) -> Self {
        match value {
            "inherit" | "" => OutputTarget::Inherit,
            "null" => OutputTarget::Null,
            path => OutputTarget::File(PathBuf::from(path)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    binary: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    inherit_env_prefixes: Option<Vec<String>>,
    uid: Option<u32>,
    gid: Option<u32>,
    pid_file: PathBuf,
    stop_timeout: Duration,
    respawn_delay: Duration,
    stdout: OutputTarget,
    stderr: OutputTarget,
}

impl SupervisorOptions {
    pub fn new(binary: impl Into<PathBuf>, pid_file: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            env: Vec::new(),
            inherit_env_prefixes: None,
            uid: None,
            gid: None,
            pid_file: pid_file.into(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            respawn_delay: DEFAULT_RESPAWN_DELAY,
            stdout: OutputTarget::Inherit,
            stderr: OutputTarget::Inherit,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Add (or override) an environment variable for the child
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Only inherit variables from the parent environment whose names start
    /// with one of `prefixes`. Without this every variable is inherited.
    pub fn inherit_env_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inherit_env_prefixes = Some(prefixes.into_iter().map(Into::into).collect());
        self
    }

    pub fn run_as(mut self, uid: Option<u32>, gid: Option<u32>) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn with_respawn_delay(mut self, delay: Duration) -> Self {
        self.respawn_delay = delay;
        self
    }

    pub fn stdout(mut self, target: OutputTarget) -> Self {
        self.stdout = target;
        self
    }

    pub fn stderr(mut self, target: OutputTarget) -> Self {
        self.stderr = target;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn env_overrides(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn env_prefixes(&self) -> Option<&[String]> {
        self.inherit_env_prefixes.as_deref()
    }

    pub fn uid(&self) -> Option<u32> {
        self.uid
    }

    pub fn gid(&self) -> Option<u32> {
        self.gid
    }

    pub fn pid_file(&self) -> &Path {
        &self.pid_file
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    pub fn respawn_delay(&self) -> Duration {
        self.respawn_delay
    }

    pub fn stdout_target(&self) -> &OutputTarget {
        &self.stdout
    }

    pub fn stderr_target(&self) -> &OutputTarget {
        &self.stderr
    }

    /// Environment the child starts with: the filtered parent environment
    /// followed by explicit overrides
    pub fn child_environment<I>(&self, parent: I) -> Vec<(String, String)>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut vars: Vec<(String, String)> = parent
            .into_iter()
            .filter(|(key, _)| match &self.inherit_env_prefixes {
                Some(prefixes) => prefixes.iter().any(|p| key.starts_with(p.as_str())),
                None => true,
            })
            .collect();

        for (key, value) in &self.env {
            vars.retain(|(k, _)| k != key);
            vars.push((key.clone(), value.clone()));
        }
        vars
    }
}
