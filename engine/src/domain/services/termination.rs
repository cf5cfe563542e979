//! Signal-escalated termination
//!
//! SIGTERM is sent once per interval until the process disappears or the
//! stop timeout elapses, at which point SIGKILL is sent. A process that is
//! already gone counts as terminated.

use crate::domain::Result;
use crate::domain::constants::TERMINATE_INTERVAL;
use crate::domain::ports::ProcessTable;
use crate::domain::value_objects::{SignalDelivery, TerminationSignal};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

/// Terminate `pid`, escalating to SIGKILL after `stop_timeout`
pub async fn kill_pid(table: &dyn ProcessTable, pid: u32, stop_timeout: Duration) -> Result<()> {
    kill_pid_with_interval(table, pid, stop_timeout, TERMINATE_INTERVAL).await
}

pub(crate) async fn kill_pid_with_interval(
    table: &dyn ProcessTable,
    pid: u32,
    stop_timeout: Duration,
    interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + stop_timeout;

    loop {
        match table.signal(pid, TerminationSignal::Terminate)? {
            SignalDelivery::NoSuchProcess => {
                debug!(pid = pid, "Process already gone");
                return Ok(());
            }
            SignalDelivery::Delivered => debug!(pid = pid, "Sent SIGTERM"),
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sleep(interval.min(deadline - now)).await;

        if !table.is_running(pid)? {
            info!(pid = pid, "Process terminated");
            return Ok(());
        }
        if Instant::now() >= deadline {
            break;
        }
    }

    warn!(
        pid = pid,
        timeout_secs = stop_timeout.as_secs_f64(),
        "Stop timeout reached, sending SIGKILL"
    );
    match table.signal(pid, TerminationSignal::Kill)? {
        SignalDelivery::Delivered => info!(pid = pid, "Sent SIGKILL"),
        SignalDelivery::NoSuchProcess => debug!(pid = pid, "Process exited before SIGKILL"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use std::sync::Mutex;

    /// Process that dies after receiving `dies_after_terms` SIGTERMs
    /// (`None`: ignores SIGTERM)
    struct FakeTable {
        dies_after_terms: Option<usize>,
        sent: Mutex<Vec<TerminationSignal>>,
        alive: Mutex<bool>,
        fail_signals: bool,
    }

    impl FakeTable {
        fn new(dies_after_terms: Option<usize>) -> Self {
            Self {
                dies_after_terms,
                sent: Mutex::new(Vec::new()),
                alive: Mutex::new(true),
                fail_signals: false,
            }
        }

        fn sent(&self) -> Vec<TerminationSignal> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl ProcessTable for FakeTable {
        fn signal(&self, pid: u32, signal: TerminationSignal) -> Result<SignalDelivery> {
            if self.fail_signals {
                return Err(DomainError::Signal {
                    pid,
                    signal: signal.to_string(),
                    reason: "EPERM".to_string(),
                });
            }
            let mut alive = self.alive.lock().unwrap();
            if !*alive {
                return Ok(SignalDelivery::NoSuchProcess);
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(signal);
            let terms = sent
                .iter()
                .filter(|s| **s == TerminationSignal::Terminate)
                .count();
            if signal == TerminationSignal::Kill || self.dies_after_terms.is_some_and(|n| terms >= n) {
                *alive = false;
            }
            Ok(SignalDelivery::Delivered)
        }

        fn is_running(&self, _pid: u32) -> Result<bool> {
            Ok(*self.alive.lock().unwrap())
        }

        fn command_line(&self, _pid: u32) -> Result<Option<Vec<String>>> {
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooperative_process_gets_no_sigkill() {
        let table = FakeTable::new(Some(1));
        kill_pid(&table, 100, Duration::from_secs(5)).await.unwrap();
        assert_eq!(table.sent(), vec![TerminationSignal::Terminate]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sigterm_repeated_every_second() {
        let table = FakeTable::new(Some(3));
        let started = Instant::now();
        kill_pid(&table, 100, Duration::from_secs(5)).await.unwrap();

        assert_eq!(table.sent(), vec![TerminationSignal::Terminate; 3]);
        // Dies on the third SIGTERM (t=2s), noticed on the next check.
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stubborn_process_gets_sigkill_after_timeout() {
        let table = FakeTable::new(None);
        let started = Instant::now();
        kill_pid(&table, 100, Duration::from_secs(5)).await.unwrap();

        let sent = table.sent();
        assert_eq!(sent.last(), Some(&TerminationSignal::Kill));
        assert_eq!(
            sent.iter()
                .filter(|s| **s == TerminationSignal::Kill)
                .count(),
            1
        );
        assert!(sent.len() >= 5, "SIGTERM should repeat: {sent:?}");
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_process_is_success() {
        let table = FakeTable::new(None);
        *table.alive.lock().unwrap() = false;
        kill_pid(&table, 100, Duration::from_secs(5)).await.unwrap();
        assert!(table.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_errors_are_surfaced() {
        let mut table = FakeTable::new(None);
        table.fail_signals = true;
        let err = kill_pid(&table, 100, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Signal { pid: 100, .. }));
    }
}
