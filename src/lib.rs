pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod scoring;
pub mod telemetry;
pub mod worker;
