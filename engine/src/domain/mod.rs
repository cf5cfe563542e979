pub mod constants;
pub mod error;
pub mod ports;
pub mod services;
pub mod value_objects;

pub use error::{ComponentError, DomainError, Result};
pub use services::{ComponentManager, ManagerServiceInstaller, Supervisor, SystemdController, UnitFileWriter};
pub use value_objects::{
    JobKind, JobMode, JobResult, OutputTarget, ReadyProbe, SignalDelivery, SupervisorOptions,
    TerminationSignal, UnitName,
};
