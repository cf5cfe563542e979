//! Concrete components registered with the lifecycle manager

pub mod staged_files;
pub mod supervised_binary;
pub mod systemd_unit;

pub use staged_files::StagedFiles;
pub use supervised_binary::SupervisedBinary;
pub use systemd_unit::SystemdUnit;
