//! Render core errors

use thiserror::Error;

use super::api::GpuError;
use super::render_queue::RenderQueueType;
use crate::config::ConfigError;
use crate::scene::ObjectId;

/// Errors raised by the frame lifecycle and queue dispatch.
///
/// Out-of-date and suboptimal surfaces are not errors; they are reported
/// through [`crate::render::api::AcquireOutcome`] and
/// [`crate::render::api::PresentOutcome`].
#[derive(Error, Debug)]
pub enum RenderError {
    /// The platform rejected the swapchain, depth target or framebuffers
    #[error("presentation surface creation failed: {0}")]
    SurfaceCreation(#[source] GpuError),

    /// Waiting on a fence or submitting work failed irrecoverably
    #[error("device lost: {0}")]
    DeviceLost(#[source] GpuError),

    /// The surface was rebuilt with formats that differ from the pass layout
    /// existing pipelines were built against
    #[error("incompatible swap format: pipelines expect {expected}, surface now provides {found}")]
    IncompatibleSwapFormat {
        /// Layout the render passes were built with
        expected: String,
        /// Layout the rebuilt surface would need
        found: String,
    },

    /// `begin_frame` was called while a frame was already being recorded
    #[error("a frame is already in progress")]
    FrameAlreadyInProgress,

    /// `end_frame` or a recording call was made with no frame in progress
    #[error("no frame is in progress")]
    FrameNotInProgress,

    /// A surface was requested for a zero-area extent
    #[error("cannot build a presentation surface with zero area")]
    ZeroExtent,

    /// A command recording call failed
    #[error("render submission failed: {0}")]
    RenderSubmission(#[source] GpuError),

    /// An object was added to a second queue
    #[error("object {object:?} is already queued in {existing:?}, refusing to add it to {requested:?}")]
    DuplicateQueueAssignment {
        /// Offending object
        object: ObjectId,
        /// Queue currently holding the object
        existing: RenderQueueType,
        /// Queue the caller tried to add it to
        requested: RenderQueueType,
    },

    /// A GPU resource could not be created
    #[error("failed to create {resource}: {source}")]
    ResourceCreation {
        /// Name of the resource, e.g. "pipeline `opaque`"
        resource: String,
        /// Underlying failure
        #[source]
        source: GpuError,
    },

    /// Engine configuration was rejected
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

impl RenderError {
    /// Wrap a GPU error as a failure to create the named resource
    pub fn resource(resource: impl Into<String>) -> impl FnOnce(GpuError) -> Self {
        let resource = resource.into();
        move |source| Self::ResourceCreation { resource, source }
    }
}

/// Result type for render core operations
pub type RenderResult<T> = Result<T, RenderError>;
