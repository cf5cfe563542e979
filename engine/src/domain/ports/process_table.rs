//! ProcessTable port
//! Narrow view of the host process table used by the supervisor

use crate::domain::Result;
use crate::domain::value_objects::{SignalDelivery, TerminationSignal};

pub trait ProcessTable: Send + Sync {
    /// Deliver a termination signal. A pid that no longer exists is reported
    /// as `SignalDelivery::NoSuchProcess`, not as an error.
    fn signal(&self, pid: u32, signal: TerminationSignal) -> Result<SignalDelivery>;

    /// Check whether a pid currently exists
    fn is_running(&self, pid: u32) -> Result<bool>;

    /// Command line of a running process, arguments in order.
    /// `None` if the process does not exist.
    fn command_line(&self, pid: u32) -> Result<Option<Vec<String>>>;
}
