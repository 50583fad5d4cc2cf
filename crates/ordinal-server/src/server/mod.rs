pub mod config;
pub mod service;
pub mod sweeper;
pub mod telemetry;
