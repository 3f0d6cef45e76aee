pub mod reporting;
pub mod synthetic;
pub mod telemetry;
