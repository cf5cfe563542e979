#![cfg(unix)]

mod helpers;

use helpers::*;
use nodeagent_engine::domain::services::Supervisor;
use nodeagent_engine::domain::services::pid_file::{self, PidFileState};
use serial_test::serial;
use std::time::{Duration, Instant};

const LOOP_FOREVER: &str = "while :; do sleep 0.1; done";

#[tokio::test]
#[serial]
async fn test_crashing_child_is_respawned() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("invocations.log");
    let script = write_script(
        dir.path(),
        "crash.sh",
        &format!("echo run >> {}\nexit 1", log.display()),
    );

    let supervisor = Supervisor::new("crasher", script_options(dir.path(), &script), host_table());
    supervisor.supervise().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    supervisor.stop().await.unwrap();

    let invocations = count_lines(&log);
    assert!(invocations > 1, "expected respawns, saw {invocations} invocation(s)");
}

#[tokio::test]
#[serial]
async fn test_respawn_follows_exit_after_the_configured_delay() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("starts.log");
    let script = write_script(
        dir.path(),
        "stamp.sh",
        &format!("date +%s%N >> {}\nexit 1", log.display()),
    );

    let supervisor = Supervisor::new("stamper", script_options(dir.path(), &script), host_table());
    supervisor.supervise().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    supervisor.stop().await.unwrap();

    let starts: Vec<u128> = std::fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(|line| line.trim().parse().unwrap())
        .collect();
    assert!(starts.len() >= 3, "saw {} start(s)", starts.len());

    for pair in starts.windows(2) {
        let gap = Duration::from_nanos((pair[1] - pair[0]) as u64);
        assert!(gap >= Duration::from_millis(100), "respawned too early: {gap:?}");
        assert!(gap < Duration::from_millis(500), "respawned too late: {gap:?}");
    }
}

#[tokio::test]
#[serial]
async fn test_no_respawn_after_stop() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("invocations.log");
    let script = write_script(
        dir.path(),
        "short.sh",
        &format!("echo run >> {}\nsleep 0.05", log.display()),
    );

    let supervisor = Supervisor::new("short", script_options(dir.path(), &script), host_table());
    supervisor.supervise().await.unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    supervisor.stop().await.unwrap();

    let at_stop = count_lines(&log);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(count_lines(&log), at_stop);
    assert!(!supervisor.is_supervising().await);
}

#[tokio::test]
#[serial]
async fn test_stop_leaves_no_child_behind() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "loop.sh", LOOP_FOREVER);
    let options = script_options(dir.path(), &script);
    let pid_path = options.pid_file().to_path_buf();

    let supervisor = Supervisor::new("looper", options, host_table());
    supervisor.supervise().await.unwrap();
    let pid = supervisor.pid().unwrap();
    assert!(pid_is_alive(pid));

    supervisor.stop().await.unwrap();
    assert!(!pid_is_alive(pid));
    assert!(!pid_path.exists());
}

#[tokio::test]
#[serial]
async fn test_leftover_instance_is_taken_over() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "loop.sh", LOOP_FOREVER);
    let options = script_options(dir.path(), &script);

    // A previous agent run left this child and its pid file behind
    let mut leftover = std::process::Command::new(SHELL)
        .arg(&script)
        .spawn()
        .unwrap();
    let old_pid = leftover.id();
    pid_file::ensure_parent_dir(options.pid_file()).unwrap();
    pid_file::write(options.pid_file(), old_pid).unwrap();

    let pid_path = options.pid_file().to_path_buf();
    let supervisor = Supervisor::new("looper", options, host_table());
    supervisor.supervise().await.unwrap();

    let exited = wait_until(|| matches!(leftover.try_wait(), Ok(Some(_))), DEFAULT_TIMEOUT).await;
    assert!(exited, "leftover pid {old_pid} should have been terminated");

    let new_pid = supervisor.pid().unwrap();
    assert_ne!(new_pid, old_pid);
    assert_eq!(pid_file::read(&pid_path).unwrap(), PidFileState::Pid(new_pid));

    supervisor.stop().await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_stale_pid_file_for_dead_process_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(dir.path(), "loop.sh", LOOP_FOREVER);
    let options = script_options(dir.path(), &script);

    let mut gone = std::process::Command::new("/bin/true").spawn().unwrap();
    let dead_pid = gone.id();
    gone.wait().unwrap();
    pid_file::ensure_parent_dir(options.pid_file()).unwrap();
    pid_file::write(options.pid_file(), dead_pid).unwrap();

    let pid_path = options.pid_file().to_path_buf();
    let supervisor = Supervisor::new("looper", options, host_table());
    supervisor.supervise().await.unwrap();

    let pid = supervisor.pid().unwrap();
    assert_eq!(pid_file::read(&pid_path).unwrap(), PidFileState::Pid(pid));
    supervisor.stop().await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_sigterm_ignoring_child_is_killed_after_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(
        dir.path(),
        "stubborn.sh",
        &format!("trap '' TERM\n{LOOP_FOREVER}"),
    );
    let options = script_options(dir.path(), &script).with_stop_timeout(Duration::from_secs(1));

    let supervisor = Supervisor::new("stubborn", options, host_table());
    supervisor.supervise().await.unwrap();
    let pid = supervisor.pid().unwrap();
    // Let the shell install its trap before we signal it
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    supervisor.stop().await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(1), "stopped too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "stop took {elapsed:?}");
    assert!(!pid_is_alive(pid));
}
