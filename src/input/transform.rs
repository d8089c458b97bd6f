//! Pan/zoom/rotation of the photo inside the view.
//!
//! The engine owns the view matrix and its scale bounds, maps screen points
//! into image space, and runs the fling, snap, scale and rotation
//! animations. Nothing here blocks: the host calls [`TransformEngine::step`]
//! every frame while [`TransformEngine::is_animating`] is true.

use crate::constants::{DOUBLE_TAP_SCALE_FACTOR, QUARTER_TURN, SNAP_THRESHOLD};
use crate::input::animation::{
    Clock, FlingAnimation, RotateAnimation, ScaleAnimation, SnapAnimation, SystemClock,
};
use crate::input::coords::{Affine, CoordinateConverter};
use crate::input::state::Gesture;
use crate::settings::Settings;
use crate::types::{Point, Rect};
use tracing::debug;

/// Which axes a translation could apply in full
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeCode {
    None,
    XOnly,
    YOnly,
    Both,
}

impl EdgeCode {
    fn from_axes(x_ok: bool, y_ok: bool) -> Self {
        match (x_ok, y_ok) {
            (true, true) => EdgeCode::Both,
            (true, false) => EdgeCode::XOnly,
            (false, true) => EdgeCode::YOnly,
            (false, false) => EdgeCode::None,
        }
    }
}

/// Limits copied out of [`Settings`] at construction
#[derive(Clone, Debug)]
struct Limits {
    max_scale: f32,
    overzoom_factor: f32,
    edge_inset: f32,
    double_tap_zoom: bool,
    scroll_min_pointers: usize,
}

pub struct TransformEngine {
    limits: Limits,
    clock: Box<dyn Clock>,
    matrix: Affine,
    /// Fit-to-view matrix the view resets to
    base_matrix: Affine,
    rotation: f32,
    view: (f32, f32),
    image: Option<(f32, f32)>,
    min_scale: f32,
    enabled: bool,
    pinching: bool,
    /// Swallows the first double tap after a pinch
    double_tap_debounce: bool,
    pinch_focus: Point,
    scale_anim: Option<ScaleAnimation>,
    rotate_anim: Option<RotateAnimation>,
    fling: Option<FlingAnimation>,
    snap: Option<SnapAnimation>,
}

impl TransformEngine {
    pub fn new(settings: &Settings) -> Self {
        Self::with_clock(settings, Box::new(SystemClock::default()))
    }

    pub fn with_clock(settings: &Settings, clock: Box<dyn Clock>) -> Self {
        Self {
            limits: Limits {
                max_scale: settings.max_scale,
                overzoom_factor: settings.overzoom_factor,
                edge_inset: settings.dp(settings.edge_inset_dp),
                double_tap_zoom: settings.double_tap_zoom,
                scroll_min_pointers: settings.scroll_min_pointers,
            },
            clock,
            matrix: Affine::IDENTITY,
            base_matrix: Affine::IDENTITY,
            rotation: 0.0,
            view: (0.0, 0.0),
            image: None,
            min_scale: 1.0,
            enabled: true,
            pinching: false,
            double_tap_debounce: false,
            pinch_focus: Point::default(),
            scale_anim: None,
            rotate_anim: None,
            fling: None,
            snap: None,
        }
    }

    // ------------------------------------------------------------------------
    // Layout
    // ------------------------------------------------------------------------

    /// Attach a new image and fit it to the view
    pub fn bind_image(&mut self, width: u32, height: u32) {
        self.image = (width > 0 && height > 0).then_some((width as f32, height as f32));
        self.refit();
    }

    pub fn unbind_image(&mut self) {
        self.image = None;
        self.refit();
    }

    /// The view was laid out with a new size
    pub fn set_view_size(&mut self, width: f32, height: f32) {
        self.view = (width.max(0.0), height.max(0.0));
        self.refit();
    }

    fn refit(&mut self) {
        self.stop_animations();
        self.rotation = 0.0;
        let (vw, vh) = self.view;
        let Some((iw, ih)) = self.image.filter(|_| vw > 0.0 && vh > 0.0) else {
            self.base_matrix = Affine::IDENTITY;
            self.matrix = Affine::IDENTITY;
            self.min_scale = 1.0;
            return;
        };

        let fit = (vw / iw).min(vh / ih);
        self.base_matrix =
            Affine::scale_translate(fit, (vw - iw * fit) / 2.0, (vh - ih * fit) / 2.0);
        self.matrix = self.base_matrix;

        let inset = self.limits.edge_inset;
        let min_w = iw - 2.0 * inset;
        let min_h = ih - 2.0 * inset;
        self.min_scale = if min_w > 0.0 && min_h > 0.0 {
            (vw / min_w).min(vh / min_h)
        } else {
            fit
        };
        debug!(fit, min_scale = self.min_scale, "Fitted image to view");
    }

    /// Return to the fitted, unrotated view
    pub fn reset(&mut self) {
        self.stop_animations();
        self.rotation = 0.0;
        self.matrix = self.base_matrix;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.stop_animations();
        }
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn matrix(&self) -> &Affine {
        &self.matrix
    }

    pub fn scale_factor(&self) -> f32 {
        self.matrix.scale_factor()
    }

    pub fn min_scale(&self) -> f32 {
        self.min_scale
    }

    pub fn max_scale(&self) -> f32 {
        self.limits.max_scale
    }

    /// Accumulated rotation in degrees
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn view_size(&self) -> (f32, f32) {
        self.view
    }

    pub fn is_pinching(&self) -> bool {
        self.pinching
    }

    /// Image bounds on screen
    pub fn image_rect(&self) -> Option<Rect> {
        let (iw, ih) = self.image?;
        Some(self.matrix.map_rect(&Rect::from_size(iw, ih)))
    }

    /// Inverse-map a screen point into image pixels
    pub fn map_to_image_space(&self, screen: Point) -> Option<Point> {
        CoordinateConverter::screen_to_image(screen, &self.matrix)
    }

    pub fn is_animating(&self) -> bool {
        self.scale_anim.is_some()
            || self.rotate_anim.is_some()
            || self.fling.is_some()
            || self.snap.is_some()
    }

    pub fn is_flinging(&self) -> bool {
        self.fling.is_some()
    }

    pub fn is_snapping(&self) -> bool {
        self.snap.is_some()
    }

    fn view_center(&self) -> Point {
        Point::new(self.view.0 / 2.0, self.view.1 / 2.0)
    }

    fn stop_animations(&mut self) {
        self.scale_anim = None;
        self.rotate_anim = None;
        self.fling = None;
        self.snap = None;
    }

    // ------------------------------------------------------------------------
    // Core transforms
    // ------------------------------------------------------------------------

    /// Zoom to `target` around a screen focus, clamped to
    /// `[min_scale, max_scale × overzoom]`.
    pub fn scale(&mut self, target: f32, focus_x: f32, focus_y: f32) {
        if self.image.is_none() {
            return;
        }
        let upper = (self.limits.max_scale * self.limits.overzoom_factor).max(self.min_scale);
        let target = target.max(self.min_scale).min(upper);
        let current = self.matrix.scale_factor();
        if current <= 0.0 || !target.is_finite() {
            return;
        }

        // Scale in the unrotated frame so the focus stays put
        let center = self.view_center();
        let mut unrotate = Affine::IDENTITY;
        unrotate.post_rotate(-self.rotation, center.x, center.y);
        let focus = unrotate.map_point(Point::new(focus_x, focus_y));

        self.matrix.post_rotate(-self.rotation, center.x, center.y);
        self.matrix.post_scale(target / current, focus.x, focus.y);
        self.matrix.post_rotate(self.rotation, center.x, center.y);
    }

    /// Move the image, keeping it inside the view where it is larger than
    /// the view and centered where it is smaller.
    pub fn translate(&mut self, dx: f32, dy: f32) -> EdgeCode {
        let Some(rect) = self.image_rect() else {
            return EdgeCode::None;
        };
        let (vw, vh) = self.view;
        let apply_x = clamp_axis(dx, rect.left, rect.right, vw);
        let apply_y = clamp_axis(dy, rect.top, rect.bottom, vh);
        self.matrix.post_translate(apply_x, apply_y);
        EdgeCode::from_axes(apply_x == dx, apply_y == dy)
    }

    /// Correction that would bring the image back into a valid position
    fn snap_offset(&self) -> Option<(f32, f32)> {
        let rect = self.image_rect()?;
        let (vw, vh) = self.view;
        Some((
            snap_axis(rect.left, rect.right, vw),
            snap_axis(rect.top, rect.bottom, vh),
        ))
    }

    /// Pull the image back into the view, animating large corrections.
    pub fn snap(&mut self) {
        let Some((dx, dy)) = self.snap_offset() else {
            return;
        };
        if dx.abs() > SNAP_THRESHOLD || dy.abs() > SNAP_THRESHOLD {
            self.snap = Some(SnapAnimation::new(self.clock.now_ms(), dx, dy));
        } else if dx != 0.0 || dy != 0.0 {
            self.matrix.post_translate(dx, dy);
        }
    }

    /// Start a decelerating pan with velocity in px/s
    pub fn fling(&mut self, vx: f32, vy: f32) {
        if self.image.is_none() || (vx == 0.0 && vy == 0.0) {
            return;
        }
        self.snap = None;
        self.fling = Some(FlingAnimation::new(self.clock.now_ms(), vx, vy));
    }

    /// Rotate clockwise by `degrees` around the view center
    pub fn rotate(&mut self, degrees: f32, animated: bool) {
        if self.image.is_none() || degrees == 0.0 {
            return;
        }
        if animated {
            // Finish any running rotation first so angles stay exact
            if let Some(previous) = self.rotate_anim.take() {
                self.apply_rotation(previous.remaining());
            }
            self.rotate_anim = Some(RotateAnimation::new(self.clock.now_ms(), degrees));
        } else {
            self.apply_rotation(degrees);
        }
    }

    pub fn rotate_clockwise(&mut self) {
        self.rotate(QUARTER_TURN, true);
    }

    pub fn rotate_counter_clockwise(&mut self) {
        self.rotate(-QUARTER_TURN, true);
    }

    fn apply_rotation(&mut self, degrees: f32) {
        let center = self.view_center();
        self.matrix.post_rotate(degrees, center.x, center.y);
        self.rotation = (self.rotation + degrees).rem_euclid(360.0);
    }

    // ------------------------------------------------------------------------
    // Gestures
    // ------------------------------------------------------------------------

    /// Route a recognized gesture; returns whether it was consumed
    pub fn on_gesture(&mut self, gesture: &Gesture) -> bool {
        match *gesture {
            Gesture::Down => {
                self.down();
                false
            }
            Gesture::Up => {
                self.up();
                false
            }
            Gesture::Tap(_) => false,
            Gesture::DoubleTap(p) => self.double_tap(p),
            Gesture::Scroll { dx, dy, pointers } => self.pan_by(dx, dy, pointers),
            Gesture::Fling { vx, vy, pointers } => self.fling_with(vx, vy, pointers),
            Gesture::ScaleBegin { focus } => self.scale_begin(focus),
            Gesture::Scale { factor, focus } => self.scale_by(factor, focus),
            Gesture::ScaleEnd => self.scale_end(),
        }
    }

    /// Pointer went down: stop coasting
    pub fn down(&mut self) {
        self.fling = None;
        self.snap = None;
    }

    /// All pointers lifted
    pub fn up(&mut self) {
        if self.fling.is_none() && self.scale_anim.is_none() && !self.pinching {
            self.snap();
        }
    }

    fn gesture_allowed(&self, pointers: usize) -> bool {
        self.enabled
            && self.image.is_some()
            && self.scale_anim.is_none()
            && pointers >= self.limits.scroll_min_pointers
    }

    /// Scroll gesture; ignored with too few pointers or while zoom animates
    pub fn pan_by(&mut self, dx: f32, dy: f32, pointers: usize) -> bool {
        if !self.gesture_allowed(pointers) {
            return false;
        }
        self.translate(dx, dy);
        true
    }

    pub fn fling_with(&mut self, vx: f32, vy: f32, pointers: usize) -> bool {
        if !self.gesture_allowed(pointers) {
            return false;
        }
        self.fling(vx, vy);
        true
    }

    pub fn scale_begin(&mut self, focus: Point) -> bool {
        if !self.enabled || self.image.is_none() {
            return false;
        }
        self.pinching = true;
        self.pinch_focus = focus;
        self.fling = None;
        self.snap = None;
        true
    }

    pub fn scale_by(&mut self, factor: f32, focus: Point) -> bool {
        if !self.pinching || self.scale_anim.is_some() || !(factor > 0.0) {
            return false;
        }
        self.pinch_focus = focus;
        let target = self.scale_factor() * factor;
        self.scale(target, focus.x, focus.y);
        true
    }

    /// Pinch finished: ease back from overzoom, otherwise snap
    pub fn scale_end(&mut self) -> bool {
        if !self.pinching {
            return false;
        }
        self.pinching = false;
        self.double_tap_debounce = true;
        let current = self.scale_factor();
        if current > self.limits.max_scale {
            self.scale_anim = Some(ScaleAnimation::new(
                self.clock.now_ms(),
                current,
                self.limits.max_scale,
                self.pinch_focus,
            ));
        } else {
            self.snap();
        }
        true
    }

    /// Toggle between the minimum zoom and twice the current zoom
    pub fn double_tap(&mut self, tap: Point) -> bool {
        if !self.enabled || !self.limits.double_tap_zoom || self.pinching {
            return false;
        }
        if self.double_tap_debounce {
            self.double_tap_debounce = false;
            return false;
        }
        let Some(rect) = self.image_rect() else {
            return false;
        };
        let current = self.scale_factor();
        if current <= 0.0 {
            return false;
        }

        let (target, focus) = if current > self.min_scale + f32::EPSILON {
            let target = self.min_scale;
            (target, self.zoom_out_focus(&rect, target / current))
        } else {
            let target = (current * DOUBLE_TAP_SCALE_FACTOR)
                .min(self.limits.max_scale)
                .max(self.min_scale);
            if target <= current {
                return false;
            }
            (target, self.zoom_in_focus(&rect, target / current, tap))
        };

        self.fling = None;
        self.snap = None;
        self.scale_anim = Some(ScaleAnimation::new(self.clock.now_ms(), current, target, focus));
        true
    }

    /// Focus that lands the image center on the view center after scaling by `f`
    fn zoom_out_focus(&self, rect: &Rect, f: f32) -> Point {
        let view_center = self.view_center();
        if (1.0 - f).abs() <= f32::EPSILON {
            return view_center;
        }
        let c = rect.center();
        Point::new(
            (view_center.x - f * c.x) / (1.0 - f),
            (view_center.y - f * c.y) / (1.0 - f),
        )
    }

    /// Keep the tap fixed unless that would pull an edge into the view
    fn zoom_in_focus(&self, rect: &Rect, f: f32, tap: Point) -> Point {
        let (vw, vh) = self.view;
        Point::new(
            zoom_focus_axis(tap.x, rect.left, rect.right, vw, f),
            zoom_focus_axis(tap.y, rect.top, rect.bottom, vh, f),
        )
    }

    // ------------------------------------------------------------------------
    // Animation stepping
    // ------------------------------------------------------------------------

    /// Advance running animations; returns whether another frame is needed
    pub fn step(&mut self) -> bool {
        let now = self.clock.now_ms();

        if let Some(anim) = self.scale_anim.take() {
            let (scale, done) = anim.sample(now);
            self.scale(scale, anim.focus.x, anim.focus.y);
            if done {
                self.snap();
            } else {
                self.scale_anim = Some(anim);
            }
        }

        if let Some(mut anim) = self.rotate_anim.take() {
            let (delta, done) = anim.advance(now);
            self.apply_rotation(delta);
            if done {
                self.snap();
            } else {
                self.rotate_anim = Some(anim);
            }
        }

        if let Some(mut fling) = self.fling.take() {
            let dt = fling.tick(now);
            if dt > 0.0 {
                let code = self.translate(fling.vx * dt, fling.vy * dt);
                match code {
                    EdgeCode::Both => {}
                    EdgeCode::XOnly => fling.lock_to_x(),
                    EdgeCode::YOnly => fling.lock_to_y(),
                    EdgeCode::None => {
                        fling.vx = 0.0;
                        fling.vy = 0.0;
                    }
                }
                fling.decelerate(dt);
            }
            if fling.is_stopped() {
                self.snap();
            } else {
                self.fling = Some(fling);
            }
        }

        if let Some(mut snap) = self.snap.take() {
            let ((dx, dy), done) = snap.advance(now);
            if dx != 0.0 || dy != 0.0 {
                self.matrix.post_translate(dx, dy);
            }
            if !done {
                self.snap = Some(snap);
            }
        }

        self.is_animating()
    }
}

/// Delta actually applied on one axis
fn clamp_axis(delta: f32, start: f32, end: f32, view: f32) -> f32 {
    if end - start < view {
        (view - (end + start)) / 2.0
    } else {
        delta.max(view - end).min(-start)
    }
}

/// Offset that centers a small image or pulls a large one flush
fn snap_axis(start: f32, end: f32, view: f32) -> f32 {
    if end - start < view {
        (view - (end + start)) / 2.0
    } else if start > 0.0 {
        -start
    } else if end < view {
        view - end
    } else {
        0.0
    }
}

/// Focus for scaling by `f` (> 1) that keeps `tap` fixed where possible
/// while the zoomed image still covers the view on this axis
fn zoom_focus_axis(tap: f32, start: f32, end: f32, view: f32, f: f32) -> f32 {
    if f <= 1.0 {
        return tap;
    }
    let lower = f * start / (f - 1.0);
    let upper = (f * end - view) / (f - 1.0);
    if lower <= upper {
        tap.max(lower).min(upper)
    } else {
        (start + end) / 2.0
    }
}
