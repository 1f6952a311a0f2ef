pub mod config;
pub mod domain;
pub mod power_flow;
pub mod telemetry;
