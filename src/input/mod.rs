//! Touch input handling for the recolor view.
//!
//! ## Architecture
//!
//! Raw touches drive the freehand tracker and the polygon selector; gestures
//! recognized by the host (tap, scroll, fling, pinch) drive the transform
//! engine. The session keeps one [`InteractionState`] so only one consumer
//! owns a touch sequence at a time.
//!
//! ## Modules
//!
//! - `coords` - Affine view matrix and screen/image conversion
//! - `animation` - Clocks and frame-stepped animations
//! - `state` - Touch/gesture types and the interaction state machine
//! - `transform` - Pan, zoom, rotation, fling and snap

pub mod animation;
pub mod coords;
mod state;
mod transform;

pub use animation::{Clock, ManualClock, SystemClock};
pub use coords::{Affine, CoordinateConverter};
pub use state::{Gesture, InteractionState, TouchEvent, TouchPhase};
pub use transform::{EdgeCode, TransformEngine};

use crate::error::RecolorResult;
use crate::types::Mask;

/// Something that follows the current view matrix
pub trait Transformable {
    fn set_view_matrix(&mut self, matrix: &Affine);
}

/// Something that consumes raw touch events
pub trait TouchConsumer {
    /// Returns whether the event was consumed
    fn on_touch(&mut self, event: &TouchEvent) -> bool;
}

/// Something that renders into an image-space mask
pub trait Drawable {
    fn rasterize(&self, width: u32, height: u32) -> RecolorResult<Mask>;
}
