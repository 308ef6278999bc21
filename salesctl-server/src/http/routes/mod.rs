//! Route handlers organized by report family

pub mod charts;
pub mod health;
pub mod reports;
