//! Component that delegates entirely to a host systemd unit

use crate::domain::ports::{Component, ReadyCheck};
use crate::domain::services::SystemdController;
use crate::domain::value_objects::UnitName;
use crate::domain::{DomainError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct SystemdUnit {
    name: String,
    unit: UnitName,
    controller: Arc<SystemdController>,
    ready_when_active: bool,
}

impl SystemdUnit {
    pub fn new(name: impl Into<String>, unit: &str, controller: Arc<SystemdController>) -> Self {
        Self {
            name: name.into(),
            unit: UnitName::new(unit),
            controller,
            ready_when_active: true,
        }
    }

    /// Skip the readiness gate; start returns as soon as the start job is done
    pub fn without_ready_check(mut self) -> Self {
        self.ready_when_active = false;
        self
    }

    pub fn unit(&self) -> &UnitName {
        &self.unit
    }
}

#[async_trait]
impl Component for SystemdUnit {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&self, _token: CancellationToken) -> Result<()> {
        if !self.controller.unit_exists(self.unit.as_str()).await? {
            return Err(DomainError::component(
                &self.name,
                format!("unit {} not found", self.unit),
            ));
        }
        Ok(())
    }

    async fn start(&self, _token: CancellationToken) -> Result<()> {
        self.controller.enable_and_start(self.unit.as_str()).await
    }

    async fn stop(&self) -> Result<()> {
        self.controller.stop(self.unit.as_str()).await
    }

    fn ready_check(&self) -> Option<&dyn ReadyCheck> {
        self.ready_when_active.then_some(self as &dyn ReadyCheck)
    }
}

#[async_trait]
impl ReadyCheck for SystemdUnit {
    async fn ready(&self) -> Result<()> {
        if self.controller.is_active(self.unit.as_str()).await? {
            Ok(())
        } else {
            Err(DomainError::component(
                &self.name,
                format!("unit {} is not active", self.unit),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::fakes::FakeBus;

    fn component(bus: &Arc<FakeBus>) -> SystemdUnit {
        SystemdUnit::new(
            "kubelet",
            "kubelet",
            Arc::new(SystemdController::new(bus.init_system())),
        )
    }

    #[tokio::test]
    async fn test_init_requires_existing_unit() {
        let bus = FakeBus::new();
        let unit = component(&bus);
        assert!(unit.init(CancellationToken::new()).await.is_err());

        bus.add_unit("kubelet.service");
        unit.init(CancellationToken::new()).await.unwrap();
    }

    #[tokio::test]
    async fn test_start_stop_and_readiness() {
        let bus = FakeBus::new();
        let unit = component(&bus);

        unit.start(CancellationToken::new()).await.unwrap();
        assert!(unit.ready_check().unwrap().ready().await.is_err());

        bus.set("kubelet.service", "ActiveState", "active");
        unit.ready_check().unwrap().ready().await.unwrap();

        unit.stop().await.unwrap();
        assert_eq!(
            bus.calls(),
            vec![
                "enable kubelet.service",
                "start kubelet.service replace",
                "stop kubelet.service replace"
            ]
        );
    }

    #[tokio::test]
    async fn test_readiness_can_be_disabled() {
        let bus = FakeBus::new();
        assert!(component(&bus).without_ready_check().ready_check().is_none());
    }
}
