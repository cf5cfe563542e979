pub mod registry;
pub mod startup;

pub use registry::{AgentServices, build_manager};
pub use startup::{Startup, start_until_shutdown};
