//! Portable termination signals
//!
//! The escalation policy only needs "ask politely" and "force". Adapters map
//! these onto SIGTERM/SIGKILL on POSIX hosts.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// Graceful termination request (SIGTERM)
    Terminate,
    /// Forced termination (SIGKILL)
    Kill,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Terminate => write!(f, "SIGTERM"),
            TerminationSignal::Kill => write!(f, "SIGKILL"),
        }
    }
}

/// Outcome of delivering a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalDelivery {
    Delivered,
    /// The pid does not exist (anymore)
    NoSuchProcess,
}
