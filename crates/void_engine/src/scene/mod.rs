//! Scene-side data the render core reads
//!
//! Objects live in an arena outside the core. Render queues only hold
//! [`ObjectId`]s and resolve them through [`ObjectStore`] every frame.

pub mod camera;
pub mod object;

pub use camera::Camera;
pub use object::{DrawableObject, ObjectId, ObjectKind, ObjectStore, PointLight, SceneObjects};
