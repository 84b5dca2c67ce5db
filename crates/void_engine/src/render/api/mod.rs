//! Backend-agnostic rendering API
//!
//! The traits and value types the render core is written against.

pub mod device;
pub mod types;

pub use device::{GpuDevice, GpuError, GpuResult, SurfaceSource};
pub use types::{AcquireOutcome, AttachmentLoad, ClearValues, Extent2D, PassLayout, PresentOutcome};
