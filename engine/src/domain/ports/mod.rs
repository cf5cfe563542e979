pub mod component;
pub mod init_system;
pub mod process_table;

#[cfg(test)]
pub(crate) mod fakes;

pub use component::{Component, ReadyCheck};
pub use init_system::{InitSystem, InitSystemSession};
pub use process_table::ProcessTable;
