//! Data models and structures for the connectivity probe

pub mod config;
pub mod metrics;

// Re-export main model types
pub use config::{Config, TestParameters};
pub use metrics::{ProbeOutcome, ProbeTimer, RunStatistics};
