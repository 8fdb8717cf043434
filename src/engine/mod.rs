//! Response selection, hot reload and analytics.
//!
//! The engines here hold store handles and never own state of their own, so they can run
//! concurrently with each other and with message handling.

pub mod analytics;
pub mod matcher;
pub mod reload;
pub mod report;
