pub mod config;
pub mod persistence;
pub mod pool;
pub mod service;
pub mod telemetry;
