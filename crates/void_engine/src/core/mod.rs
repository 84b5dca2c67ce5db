//! # Core Engine Module
//!
//! Engine-wide configuration shared by the render core and the driver.

pub mod config;

pub use config::{Config, ConfigError, EngineConfig, QueueConfig, RendererConfig, WindowConfig};
