//! Drawable object records and the object store the render core reads from

use slotmap::{new_key_type, DenseSlotMap};

use crate::foundation::math::{Transform, Vec3};
use crate::render::mesh::MeshId;

new_key_type! {
    /// Stable identifier of a drawable object
    pub struct ObjectId;
}

/// Point light payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// Intensity written into the uniform block's color alpha
    pub intensity: f32,
    /// Billboard radius
    pub radius: f32,
}

/// What an object is, and the data specific to that kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObjectKind {
    /// Mesh drawn with its transform
    Model,
    /// Light source contributing to the global uniform block
    PointLight(PointLight),
}

/// Object record resolved by the render core at draw time
#[derive(Debug, Clone, PartialEq)]
pub struct DrawableObject {
    /// Placement in world space
    pub transform: Transform,
    /// Base color; for lights the emitted color
    pub color: Vec3,
    /// Mesh to draw, if any
    pub mesh: Option<MeshId>,
    /// Kind and kind-specific payload
    pub kind: ObjectKind,
}

impl DrawableObject {
    /// Model object drawing `mesh`
    pub fn model(mesh: MeshId) -> Self {
        Self {
            transform: Transform::identity(),
            color: Vec3::new(1.0, 1.0, 1.0),
            mesh: Some(mesh),
            kind: ObjectKind::Model,
        }
    }

    /// Point light with the given intensity, billboard radius and color
    pub fn point_light(intensity: f32, radius: f32, color: Vec3) -> Self {
        Self {
            transform: Transform::identity().with_scale(Vec3::new(radius, 1.0, 1.0)),
            color,
            mesh: None,
            kind: ObjectKind::PointLight(PointLight { intensity, radius }),
        }
    }

    /// Builder-style transform override
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    /// Builder-style color override
    pub fn with_color(mut self, color: Vec3) -> Self {
        self.color = color;
        self
    }

    /// Light payload when this object is a point light
    pub const fn as_point_light(&self) -> Option<&PointLight> {
        match &self.kind {
            ObjectKind::PointLight(light) => Some(light),
            ObjectKind::Model => None,
        }
    }
}

impl Default for DrawableObject {
    fn default() -> Self {
        Self {
            transform: Transform::identity(),
            color: Vec3::new(1.0, 1.0, 1.0),
            mesh: None,
            kind: ObjectKind::Model,
        }
    }
}

/// Lookup used by queue dispatch to turn identifiers into live objects.
///
/// Must be cheap (called once per object per draw) and must return `None`
/// rather than fail for identifiers it does not know.
pub trait ObjectStore {
    /// Resolve `id`, or `None` if the object no longer exists
    fn resolve(&self, id: ObjectId) -> Option<&DrawableObject>;
}

/// Arena of drawable objects keyed by [`ObjectId`]
#[derive(Debug, Default)]
pub struct SceneObjects {
    objects: DenseSlotMap<ObjectId, DrawableObject>,
}

impl SceneObjects {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object and return its identifier
    pub fn insert(&mut self, object: DrawableObject) -> ObjectId {
        self.objects.insert(object)
    }

    /// Remove an object; queued references to it become stale
    pub fn remove(&mut self, id: ObjectId) -> Option<DrawableObject> {
        self.objects.remove(id)
    }

    /// Shared access
    pub fn get(&self, id: ObjectId) -> Option<&DrawableObject> {
        self.objects.get(id)
    }

    /// Mutable access
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut DrawableObject> {
        self.objects.get_mut(id)
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when the store holds no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate live objects
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &DrawableObject)> {
        self.objects.iter()
    }

    /// Iterate live objects mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ObjectId, &mut DrawableObject)> {
        self.objects.iter_mut()
    }
}

impl ObjectStore for SceneObjects {
    fn resolve(&self, id: ObjectId) -> Option<&DrawableObject> {
        self.objects.get(id)
    }
}
