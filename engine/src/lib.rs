pub mod application;
pub mod components;
pub mod domain;
pub mod infrastructure;
