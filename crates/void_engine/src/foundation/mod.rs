//! Foundation module - Core utilities and types
//!
//! - Math types and the object transform
//! - Logging initialisation

pub mod logging;
pub mod math;
