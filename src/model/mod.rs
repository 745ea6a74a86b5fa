//! Core data model: addresses, normalized messages, and the final report.

pub mod address;
pub mod message;
pub mod report;
