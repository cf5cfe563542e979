//! In-memory init system used by unit tests

use crate::domain::Result;
use crate::domain::ports::{InitSystem, InitSystemSession};
use crate::domain::value_objects::{JobKind, JobMode, JobResult, UnitName};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every call and answers property reads from a table
#[derive(Default)]
pub struct FakeBus {
    pub connections: AtomicUsize,
    pub open_sessions: AtomicUsize,
    calls: Mutex<Vec<String>>,
    properties: Mutex<HashMap<(String, String), String>>,
    known_units: Mutex<HashSet<String>>,
    job_result: Mutex<Option<JobResult>>,
    job_delay: Mutex<Option<Duration>>,
}

impl FakeBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn init_system(self: &Arc<Self>) -> Arc<dyn InitSystem> {
        Arc::new(FakeInitSystem(Arc::clone(self)))
    }

    pub fn set(&self, unit: &str, property: &str, value: &str) {
        self.properties
            .lock()
            .unwrap()
            .insert((unit.to_string(), property.to_string()), value.to_string());
    }

    pub fn add_unit(&self, unit: &str) {
        self.known_units.lock().unwrap().insert(unit.to_string());
    }

    pub fn fail_jobs_with(&self, result: JobResult) {
        *self.job_result.lock().unwrap() = Some(result);
    }

    /// Jobs are recorded on submission and complete after `delay`
    pub fn delay_jobs(&self, delay: Duration) {
        *self.job_delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

struct FakeInitSystem(Arc<FakeBus>);

struct FakeSession(Arc<FakeBus>);

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.0.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl InitSystem for FakeInitSystem {
    async fn connect(&self) -> Result<Box<dyn InitSystemSession>> {
        self.0.connections.fetch_add(1, Ordering::SeqCst);
        self.0.open_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession(Arc::clone(&self.0))))
    }
}

#[async_trait]
impl InitSystemSession for FakeSession {
    async fn enable_unit_files(&self, units: &[UnitName]) -> Result<()> {
        for unit in units {
            self.0.record(format!("enable {unit}"));
        }
        Ok(())
    }

    async fn disable_unit_files(&self, units: &[UnitName]) -> Result<()> {
        for unit in units {
            self.0.record(format!("disable {unit}"));
        }
        Ok(())
    }

    async fn submit_job(&self, kind: JobKind, unit: &UnitName, mode: JobMode) -> Result<JobResult> {
        self.0.record(format!("{kind} {unit} {mode}"));
        let delay = *self.0.job_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .0
            .job_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(JobResult::Done))
    }

    async fn unit_property(&self, unit: &UnitName, property: &str) -> Result<String> {
        Ok(self
            .0
            .properties
            .lock()
            .unwrap()
            .get(&(unit.to_string(), property.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn unit_exists(&self, unit: &UnitName) -> Result<bool> {
        Ok(self.0.known_units.lock().unwrap().contains(unit.as_str()))
    }

    async fn reload(&self) -> Result<()> {
        self.0.record("reload".to_string());
        Ok(())
    }
}
