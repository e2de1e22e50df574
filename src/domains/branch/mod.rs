pub mod actor;
pub mod service;
pub mod types;
