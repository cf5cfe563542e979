//! Component Registry
//! Composition root: turns configuration into a wired `ComponentManager`

use crate::components::{StagedFiles, SupervisedBinary, SystemdUnit};
use crate::domain::ports::{InitSystem, ProcessTable};
use crate::domain::services::{ComponentManager, Supervisor, SystemdController};
use crate::domain::Result;
use crate::infrastructure::{AgentConfig, ComponentConfig, ProbeExecutor};
use std::sync::Arc;

/// Host adapters shared by every component
#[derive(Clone)]
pub struct AgentServices {
    pub process_table: Arc<dyn ProcessTable>,
    pub init_system: Arc<dyn InitSystem>,
}

/// Register one component per configuration entry, in file order
pub fn build_manager(config: &AgentConfig, services: &AgentServices) -> Result<ComponentManager> {
    let controller = Arc::new(SystemdController::new(Arc::clone(&services.init_system)));
    let mut manager = ComponentManager::new().with_ready_timeout(config.ready_timeout());

    for entry in &config.components {
        match entry {
            ComponentConfig::Process(process) => {
                let options = process.supervisor_options(&config.runtime_dir)?;
                let supervisor = Supervisor::new(
                    &process.name,
                    options,
                    Arc::clone(&services.process_table),
                );
                let mut component = SupervisedBinary::new(supervisor);
                if let Some(probe) = process.ready_probe(&config.runtime_dir) {
                    component = component.with_probe(ProbeExecutor::new(
                        &process.name,
                        probe,
                        Arc::clone(&services.process_table),
                    ));
                }
                manager.add(Arc::new(component));
            }
            ComponentConfig::Systemd(systemd) => {
                let mut component =
                    SystemdUnit::new(&systemd.name, &systemd.unit, Arc::clone(&controller));
                if !systemd.ready_when_active {
                    component = component.without_ready_check();
                }
                manager.add(Arc::new(component));
            }
            ComponentConfig::Files(files) => {
                manager.add(Arc::new(StagedFiles::new(
                    &files.name,
                    &files.source,
                    &files.destination,
                )));
            }
        }
    }

    Ok(manager)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::ports::fakes::FakeBus;
    use crate::infrastructure::HostProcessTable;

    #[test]
    fn test_components_registered_in_config_order() {
        let config = AgentConfig::parse(
            r#"
ready_timeout_secs: 30
components:
  - {name: assets, type: files, source: /a, destination: /b}
  - {name: engine, type: process, binary: /usr/bin/engine}
  - {name: kubelet, type: systemd, unit: kubelet, ready_when_active: false}
"#,
        )
        .unwrap();
        let services = AgentServices {
            process_table: Arc::new(HostProcessTable::new()),
            init_system: FakeBus::new().init_system(),
        };

        let manager = build_manager(&config, &services).unwrap();
        assert_eq!(manager.component_names(), vec!["assets", "engine", "kubelet"]);
    }
}
