//! Backend-neutral value types exchanged between the render core and a GPU device.

/// Width and height of a presentable surface in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Extent2D {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Extent2D {
    /// Create a new extent
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A minimized window reports a zero-area extent; nothing may be built for it.
    pub const fn is_zero_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Width divided by height, or 1.0 for a zero-area extent
    #[allow(clippy::cast_precision_loss)]
    pub fn aspect_ratio(&self) -> f32 {
        if self.is_zero_area() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Result of asking the surface for the next presentable image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is (or will be, once the semaphore signals) ready for rendering
    Acquired {
        /// Index into the surface's image set
        image_index: u32,
        /// The image can be used but no longer matches the output exactly
        suboptimal: bool,
    },
    /// The surface must be rebuilt before any image can be acquired
    OutOfDate,
}

/// Result of a presentation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Image queued for display
    Presented,
    /// Image queued, but the surface should be rebuilt
    Suboptimal,
    /// Image was not presented; the surface must be rebuilt
    OutOfDate,
}

impl PresentOutcome {
    /// Whether the surface should be rebuilt before the next frame
    pub const fn needs_rebuild(self) -> bool {
        !matches!(self, Self::Presented)
    }
}

/// How a render pass treats the attachment contents it starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentLoad {
    /// Color and depth are cleared when the pass begins
    Clear,
    /// Color and depth written by an earlier pass are kept
    Load,
}

/// Clear values used when a clearing pass begins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearValues {
    /// RGBA clear color
    pub color: [f32; 4],
    /// Depth clear value
    pub depth: f32,
}

impl Default for ClearValues {
    fn default() -> Self {
        Self {
            color: [0.01, 0.01, 0.01, 1.0],
            depth: 1.0,
        }
    }
}

/// Attachment formats a render pass, its framebuffers and every pipeline built
/// against it agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassLayout<F> {
    /// Color attachment (swap image) format
    pub color: F,
    /// Depth attachment format
    pub depth: F,
}
