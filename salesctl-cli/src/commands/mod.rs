//! Command implementations for the salesctl CLI

pub mod report;
pub mod serve;
pub mod warehouse;

// Re-export dispatcher functions for flat access from main.rs
pub use report::{run_list, run_report};
pub use serve::run_serve;
