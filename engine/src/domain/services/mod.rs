pub mod component_manager;
pub mod pid_file;
pub mod process_supervisor;
pub mod service_installer;
pub mod termination;
pub mod unit_controller;
pub mod unit_files;

pub use component_manager::ComponentManager;
pub use process_supervisor::Supervisor;
pub use service_installer::ManagerServiceInstaller;
pub use termination::kill_pid;
pub use unit_controller::SystemdController;
pub use unit_files::UnitFileWriter;
