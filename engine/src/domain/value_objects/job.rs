//! Init-system job vocabulary
//!
//! A job is an asynchronous request to the init system. It is submitted with
//! a mode and completes exactly once with a terminal result string.

use std::fmt;

/// Kind of job submitted for a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Start,
    Stop,
    Restart,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Start => write!(f, "start"),
            JobKind::Stop => write!(f, "stop"),
            JobKind::Restart => write!(f, "restart"),
        }
    }
}

/// How a new job interacts with jobs already queued for the unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobMode {
    /// Replace any conflicting queued job
    #[default]
    Replace,
    /// Fail if a conflicting job is queued
    Fail,
}

impl JobMode {
    pub fn as_str(self) -> &'static str {
        match self {
            JobMode::Replace => "replace",
            JobMode::Fail => "fail",
        }
    }
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal result of a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Done,
    Canceled,
    Timeout,
    Failed,
    Dependency,
    Skipped,
    Other(String),
}

impl JobResult {
    pub fn parse(result: &str) -> Self {
        match result {
            "done" => JobResult::Done,
            "canceled" => JobResult::Canceled,
            "timeout" => JobResult::Timeout,
            "failed" => JobResult::Failed,
            "dependency" => JobResult::Dependency,
            "skipped" => JobResult::Skipped,
            other => JobResult::Other(other.to_string()),
        }
    }

    pub fn is_done(&self) -> bool {
        *self == JobResult::Done
    }
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobResult::Done => write!(f, "done"),
            JobResult::Canceled => write!(f, "canceled"),
            JobResult::Timeout => write!(f, "timeout"),
            JobResult::Failed => write!(f, "failed"),
            JobResult::Dependency => write!(f, "dependency"),
            JobResult::Skipped => write!(f, "skipped"),
            JobResult::Other(s) => write!(f, "{s}"),
        }
    }
}
