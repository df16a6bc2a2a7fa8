//! Foundation module - Core utilities and types
//!
//! - Math types and operations
//! - Time-varying value sources
//! - Object identity registry
//! - Logging utilities

pub mod math;
pub mod variable;
pub mod registry;
pub mod logging;
