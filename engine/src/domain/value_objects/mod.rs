pub mod job;
pub mod ready_probe;
pub mod supervisor_options;
pub mod termination_signal;
pub mod unit_name;

pub use job::{JobKind, JobMode, JobResult};
pub use ready_probe::ReadyProbe;
pub use supervisor_options::{OutputTarget, SupervisorOptions};
pub use termination_signal::{SignalDelivery, TerminationSignal};
pub use unit_name::{UnitName, normalize};
