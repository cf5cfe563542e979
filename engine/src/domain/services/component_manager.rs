//! Component Lifecycle Manager
//!
//! Sequences init/start/stop across independent components:
//! - `init` fans out to every component at once and fails fast
//! - `start` runs components one by one in registration order, gating each
//!   on its ready check, and rolls back everything already started on failure
//! - `stop` tears down started components in reverse order, collecting errors

use crate::domain::constants::{DEFAULT_READY_TIMEOUT, READY_POLL_INTERVAL};
use crate::domain::error::ComponentError;
use crate::domain::ports::Component;
use crate::domain::{DomainError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct ComponentManager {
    components: Vec<Arc<dyn Component>>,
    /// Components whose `start` succeeded and that have not been stopped yet
    started: Mutex<Vec<Arc<dyn Component>>>,
    ready_timeout: Duration,
    ready_interval: Duration,
}

impl ComponentManager {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            started: Mutex::new(Vec::new()),
            ready_timeout: DEFAULT_READY_TIMEOUT,
            ready_interval: READY_POLL_INTERVAL,
        }
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Register a component. Registration order is start order.
    pub fn add(&mut self, component: Arc<dyn Component>) {
        debug!(component = %component.name(), "Registered component");
        self.components.push(component);
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.name()).collect()
    }

    /// Names of currently started components, oldest first
    pub async fn started_names(&self) -> Vec<String> {
        self.started
            .lock()
            .await
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Run `init` on every component concurrently
    ///
    /// Returns the first error. Sibling inits see their token cancelled once
    /// an error is seen; nothing is rolled back since init is re-runnable.
    pub async fn init(&self, token: CancellationToken) -> Result<()> {
        let token = token.child_token();
        let mut tasks = JoinSet::new();

        for component in &self.components {
            let component = Arc::clone(component);
            let token = token.clone();
            tasks.spawn(async move {
                let name = component.name().to_string();
                debug!(component = %name, "Initializing component");
                component.init(token).await.map_err(|e| (name, e))
            });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.unwrap_or_else(|e| {
                Err((
                    "unknown".to_string(),
                    DomainError::ComponentFailed {
                        component: "unknown".to_string(),
                        reason: format!("init task failed: {e}"),
                    },
                ))
            });

            if let Err((name, err)) = outcome {
                error!(component = %name, error = %err, "Component init failed");
                if first_error.is_none() {
                    token.cancel();
                    first_error = Some(err);
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                info!(count = self.components.len(), "All components initialized");
                Ok(())
            }
        }
    }

    /// Start components sequentially, waiting for each to become ready
    ///
    /// On a start failure or readiness timeout every started component is
    /// stopped (newest first) before the triggering error is returned. A
    /// cancelled token lets the in-flight `start` finish, then rolls back
    /// instead of starting the next component.
    pub async fn start(&self, token: CancellationToken) -> Result<()> {
        for component in &self.components {
            let name = component.name();
            if token.is_cancelled() {
                warn!(component = %name, "Start interrupted");
                self.rollback().await;
                return Err(DomainError::Cancelled(format!("starting component {name}")));
            }
            info!(component = %name, "Starting component");

            if let Err(e) = component.start(token.clone()).await {
                error!(component = %name, error = %e, "Component failed to start");
                self.rollback().await;
                return Err(DomainError::StartFailed {
                    component: name.to_string(),
                    source: Box::new(e),
                });
            }
            self.started.lock().await.push(Arc::clone(component));

            if let Err(e) = self.wait_for_ready(component.as_ref(), &token).await {
                error!(component = %name, error = %e, "Component never became ready");
                self.rollback().await;
                return Err(e);
            }

            info!(component = %name, "Component started");
        }
        Ok(())
    }

    /// Stop every started component in reverse start order
    ///
    /// A failing stop does not prevent the remaining stops; all failures are
    /// returned together.
    pub async fn stop(&self) -> Result<()> {
        let mut errors = Vec::new();

        loop {
            let next = self.started.lock().await.pop();
            let Some(component) = next else {
                break;
            };

            let name = component.name().to_string();
            info!(component = %name, "Stopping component");
            match component.stop().await {
                Ok(()) => debug!(component = %name, "Component stopped"),
                Err(e) => {
                    warn!(component = %name, error = %e, "Component failed to stop");
                    errors.push(ComponentError {
                        component: name,
                        error: e,
                    });
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::StopFailed(errors))
        }
    }

    async fn rollback(&self) {
        if let Err(e) = self.stop().await {
            warn!(error = %e, "Rollback left components in a failed state");
        }
    }

    async fn wait_for_ready(&self, component: &dyn Component, token: &CancellationToken) -> Result<()> {
        let Some(check) = component.ready_check() else {
            return Ok(());
        };

        let name = component.name();
        let deadline = Instant::now() + self.ready_timeout;
        let mut last_error = String::from("ready check never ran");

        loop {
            match timeout_at(deadline, check.ready()).await {
                Ok(Ok(())) => {
                    info!(component = %name, "Component ready");
                    return Ok(());
                }
                Ok(Err(e)) => {
                    debug!(component = %name, error = %e, "Component not ready yet");
                    last_error = e.to_string();
                }
                Err(_) => {
                    last_error = "ready check did not return in time".to_string();
                }
            }

            if Instant::now() >= deadline {
                return Err(DomainError::ReadinessTimeout {
                    component: name.to_string(),
                    timeout: self.ready_timeout,
                    last_error,
                });
            }

            tokio::select! {
                _ = token.cancelled() => {
                    return Err(DomainError::Cancelled(format!(
                        "waiting for component {name} to become ready"
                    )));
                }
                _ = sleep(self.ready_interval) => {}
            }
        }
    }
}

impl Default for ComponentManager {
    fn default() -> Self {
        Self::new()
    }
}
