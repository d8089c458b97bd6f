//! Time sources and the animations the transform engine steps.
//!
//! Animations never sleep or spawn threads. The engine calls `step` once per
//! frame and each animation derives its progress from the clock, so a slow
//! frame only makes the next step larger.

use crate::constants::{
    FLING_DECELERATION, ROTATE_ANIMATION_MS, SCALE_ANIMATION_MS, SNAP_DELAY_MS, SNAP_DURATION_MS,
};
use crate::types::Point;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Millisecond time source
pub trait Clock: Send {
    fn now_ms(&self) -> u64;
}

/// Wall clock measured from creation
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Clock advanced by hand; clones share the same time.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Scale
// ============================================================================

/// Linear zoom toward a target scale around a fixed focus.
#[derive(Clone, Debug)]
pub struct ScaleAnimation {
    start_ms: u64,
    start_scale: f32,
    target: f32,
    /// Scale change per millisecond
    velocity: f32,
    pub focus: Point,
}

impl ScaleAnimation {
    pub fn new(now_ms: u64, start_scale: f32, target: f32, focus: Point) -> Self {
        Self {
            start_ms: now_ms,
            start_scale,
            target,
            velocity: (target - start_scale) / SCALE_ANIMATION_MS,
            focus,
        }
    }

    /// Scale to apply now, and whether the animation has finished
    pub fn sample(&self, now_ms: u64) -> (f32, bool) {
        let elapsed = now_ms.saturating_sub(self.start_ms) as f32;
        if elapsed >= SCALE_ANIMATION_MS {
            (self.target, true)
        } else {
            (self.start_scale + self.velocity * elapsed, false)
        }
    }

    pub fn target(&self) -> f32 {
        self.target
    }
}

// ============================================================================
// Rotation
// ============================================================================

#[derive(Clone, Debug)]
pub struct RotateAnimation {
    start_ms: u64,
    total: f32,
    applied: f32,
}

impl RotateAnimation {
    pub fn new(now_ms: u64, degrees: f32) -> Self {
        Self {
            start_ms: now_ms,
            total: degrees,
            applied: 0.0,
        }
    }

    /// Rotation to add since the previous step, and whether it has finished
    pub fn advance(&mut self, now_ms: u64) -> (f32, bool) {
        let elapsed = now_ms.saturating_sub(self.start_ms) as f32;
        let done = elapsed >= ROTATE_ANIMATION_MS;
        let target = if done {
            self.total
        } else {
            self.total / ROTATE_ANIMATION_MS * elapsed
        };
        let delta = target - self.applied;
        self.applied = target;
        (delta, done)
    }

    /// Degrees not yet applied
    pub fn remaining(&self) -> f32 {
        self.total - self.applied
    }
}

// ============================================================================
// Fling
// ============================================================================

/// Velocity decay along the fling direction (px/s, px/s²).
#[derive(Clone, Debug)]
pub struct FlingAnimation {
    pub vx: f32,
    pub vy: f32,
    decel_x: f32,
    decel_y: f32,
    last_ms: u64,
}

impl FlingAnimation {
    pub fn new(now_ms: u64, vx: f32, vy: f32) -> Self {
        let angle = vy.atan2(vx);
        Self {
            vx,
            vy,
            decel_x: FLING_DECELERATION * angle.cos(),
            decel_y: FLING_DECELERATION * angle.sin(),
            last_ms: now_ms,
        }
    }

    /// Seconds since the previous step
    pub fn tick(&mut self, now_ms: u64) -> f32 {
        let dt = now_ms.saturating_sub(self.last_ms) as f32 / 1000.0;
        self.last_ms = now_ms;
        dt
    }

    /// Stop the vertical axis and decelerate horizontally only
    pub fn lock_to_x(&mut self) {
        self.vy = 0.0;
        self.decel_y = 0.0;
        self.decel_x = FLING_DECELERATION.copysign(self.vx);
    }

    /// Stop the horizontal axis and decelerate vertically only
    pub fn lock_to_y(&mut self) {
        self.vx = 0.0;
        self.decel_x = 0.0;
        self.decel_y = FLING_DECELERATION.copysign(self.vy);
    }

    pub fn decelerate(&mut self, dt: f32) {
        self.vx = decay(self.vx, self.decel_x * dt);
        self.vy = decay(self.vy, self.decel_y * dt);
    }

    pub fn is_stopped(&self) -> bool {
        self.vx == 0.0 && self.vy == 0.0
    }
}

/// Reduce `v` by `amount` (same sign as `v`) without crossing zero
fn decay(v: f32, amount: f32) -> f32 {
    let next = v - amount;
    if next * v <= 0.0 { 0.0 } else { next }
}

// ============================================================================
// Snap
// ============================================================================

/// Delayed, eased correction of the image position.
#[derive(Clone, Debug)]
pub struct SnapAnimation {
    start_ms: u64,
    dx: f32,
    dy: f32,
    moved_x: f32,
    moved_y: f32,
}

impl SnapAnimation {
    pub fn new(now_ms: u64, dx: f32, dy: f32) -> Self {
        Self {
            start_ms: now_ms + SNAP_DELAY_MS,
            dx,
            dy,
            moved_x: 0.0,
            moved_y: 0.0,
        }
    }

    /// Translation to apply since the previous step, and whether it has finished
    pub fn advance(&mut self, now_ms: u64) -> ((f32, f32), bool) {
        if now_ms < self.start_ms {
            return ((0.0, 0.0), false);
        }
        let progress = ((now_ms - self.start_ms) as f32 / SNAP_DURATION_MS as f32).min(1.0);
        let eased = 1.0 - (1.0 - progress) * (1.0 - progress);
        let (target_x, target_y) = (self.dx * eased, self.dy * eased);
        let step = (target_x - self.moved_x, target_y - self.moved_y);
        self.moved_x = target_x;
        self.moved_y = target_y;
        (step, progress >= 1.0)
    }
}
