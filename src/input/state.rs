//! Touch input types and the interaction state machine.
//!
//! One explicit state replaces a set of independent flags, so a vertex drag
//! and a freehand stroke can never be active at the same time.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Drawing          (single pointer down with BRUSH/ERASER)
//! Idle -> DraggingVertex   (single pointer down on a polygon vertex with POLYGON)
//! Idle -> Pinching         (scale gesture begins)
//! Drawing -> Pinching      (second pointer: the stroke is discarded)
//!
//! Any -> Idle              (pointer up or cancel - finalizes operation)
//! ```

use crate::types::{Point, Tool};

/// Raw pointer phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// A raw touch sample in screen coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    pub position: Point,
    /// Pointers currently on screen, including this one
    pub pointer_count: usize,
}

impl TouchEvent {
    pub fn new(phase: TouchPhase, x: f32, y: f32) -> Self {
        Self {
            phase,
            position: Point::new(x, y),
            pointer_count: 1,
        }
    }

    pub fn with_pointers(mut self, pointer_count: usize) -> Self {
        self.pointer_count = pointer_count;
        self
    }
}

/// Recognized gestures, produced by the host's platform gesture detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Gesture {
    Down,
    Up,
    Tap(Point),
    DoubleTap(Point),
    /// Content movement since the previous scroll event
    Scroll { dx: f32, dy: f32, pointers: usize },
    /// Release velocity in px/s
    Fling { vx: f32, vy: f32, pointers: usize },
    ScaleBegin { focus: Point },
    Scale { factor: f32, focus: Point },
    ScaleEnd,
}

/// Unified state for touch interactions.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum InteractionState {
    /// No active touch operation
    #[default]
    Idle,

    /// A freehand stroke is being recorded
    Drawing {
        /// Tool the stroke will be finished with
        tool: Tool,
    },

    /// Moving one polygon vertex
    DraggingVertex {
        /// Index of the vertex in the selector
        index: usize,
    },

    /// Two-finger pinch in progress
    Pinching,
}

impl InteractionState {
    #[inline]
    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }

    #[inline]
    pub fn is_drawing(&self) -> bool {
        matches!(self, InteractionState::Drawing { .. })
    }

    #[inline]
    pub fn is_dragging_vertex(&self) -> bool {
        matches!(self, InteractionState::DraggingVertex { .. })
    }

    #[inline]
    pub fn is_pinching(&self) -> bool {
        matches!(self, InteractionState::Pinching)
    }

    /// Reset to idle, returning the previous state
    pub fn take(&mut self) -> InteractionState {
        std::mem::take(self)
    }
}
