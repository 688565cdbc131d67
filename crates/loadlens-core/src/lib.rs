pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod report;
pub mod stats;
pub mod telemetry;

pub use error::ReportError;
