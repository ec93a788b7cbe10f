//! Client tier classification and change-audit workflow service.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
