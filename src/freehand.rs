//! Freehand stroke capture for the brush and eraser tools.
//!
//! Points are recorded in image space and smoothed live with quadratic
//! segments through midpoints. Finishing a stroke simplifies the raw points,
//! rebuilds the smoothed path and closes it when it ends near its start.

use crate::constants::{
    BRUSH_WIDTH_PER_SIZE_DP, STROKE_CLOSE_RADIUS_DP, STROKE_SIMPLIFY_TOLERANCE,
};
use crate::error::RecolorResult;
use crate::geometry::{QuadPath, douglas_peucker, stroke_polyline};
use crate::input::{Affine, CoordinateConverter, Drawable, TouchConsumer, TouchEvent, TouchPhase, Transformable};
use crate::settings::Settings;
use crate::types::{Mask, Point};
use tracing::debug;

/// A finished stroke ready to be rasterized in image space.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeMask {
    pub path: QuadPath,
    pub stroke_width: f32,
}

impl Drawable for StrokeMask {
    fn rasterize(&self, width: u32, height: u32) -> RecolorResult<Mask> {
        stroke_polyline(&self.path.flatten(), self.stroke_width, width, height)
    }
}

pub struct FreehandTracker {
    view: Affine,
    points: Vec<Point>,
    path: QuadPath,
    stroke_width: f32,
    close_radius: f32,
    tolerance: f32,
    visible: bool,
    completed: Option<StrokeMask>,
}

impl FreehandTracker {
    pub fn new(settings: &Settings) -> Self {
        Self {
            view: Affine::IDENTITY,
            points: Vec::new(),
            path: QuadPath::new(),
            stroke_width: settings.dp(settings.brush_size * BRUSH_WIDTH_PER_SIZE_DP),
            close_radius: settings.dp(STROKE_CLOSE_RADIUS_DP),
            tolerance: STROKE_SIMPLIFY_TOLERANCE,
            visible: false,
            completed: None,
        }
    }

    /// Stroke width becomes ten dp per unit of brush size
    pub fn set_brush_size(&mut self, size: f32, density: f32) {
        if size > 0.0 {
            self.stroke_width = size * BRUSH_WIDTH_PER_SIZE_DP * density;
        }
    }

    pub fn stroke_width(&self) -> f32 {
        self.stroke_width
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if !visible {
            self.reset();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_tracking(&self) -> bool {
        !self.points.is_empty()
    }

    /// Live path for rendering the stroke in progress
    pub fn live_path(&self) -> &QuadPath {
        &self.path
    }

    pub fn begin(&mut self, point: Point) {
        self.points.clear();
        self.points.push(point);
        self.path.move_to(point);
        self.completed = None;
    }

    pub fn extend(&mut self, point: Point) {
        let Some(&last) = self.points.last() else {
            self.begin(point);
            return;
        };
        self.path.quad_to(last, last.midpoint(point));
        self.points.push(point);
    }

    /// Simplify and close the stroke. `None` if nothing was drawn.
    ///
    /// The close radius and simplify tolerance are screen distances, so they
    /// shrink in image space as the view zooms in.
    pub fn finish(&mut self) -> Option<StrokeMask> {
        if self.points.is_empty() {
            return None;
        }
        let tolerance = CoordinateConverter::distance_screen_to_image(self.tolerance, &self.view);
        let close_radius =
            CoordinateConverter::distance_screen_to_image(self.close_radius, &self.view);
        let simplified = douglas_peucker(&self.points, tolerance);
        let mut path = QuadPath::smoothed(&simplified);

        let first = self.points[0];
        let last = self.points[self.points.len() - 1];
        if self.points.len() > 2 && first.distance(last) <= close_radius {
            path.close();
        }
        debug!(
            raw = self.points.len(),
            simplified = simplified.len(),
            closed = path.is_closed(),
            "Finished freehand stroke"
        );

        self.points.clear();
        self.path.reset();
        Some(StrokeMask {
            path,
            stroke_width: self.stroke_width,
        })
    }

    /// Drop the stroke in progress
    pub fn reset(&mut self) {
        self.points.clear();
        self.path.reset();
        self.completed = None;
    }

    /// Stroke finished by the last `Up` touch, if any
    pub fn take_completed(&mut self) -> Option<StrokeMask> {
        self.completed.take()
    }
}

impl Transformable for FreehandTracker {
    fn set_view_matrix(&mut self, matrix: &Affine) {
        self.view = *matrix;
    }
}

impl TouchConsumer for FreehandTracker {
    fn on_touch(&mut self, event: &TouchEvent) -> bool {
        if !self.visible {
            return false;
        }
        if event.pointer_count != 1 {
            // A second finger turns the gesture into a pinch
            self.reset();
            return false;
        }
        let Some(point) = CoordinateConverter::screen_to_image(event.position, &self.view) else {
            return false;
        };
        match event.phase {
            TouchPhase::Down => self.begin(point),
            TouchPhase::Move => {
                if !self.is_tracking() {
                    return false;
                }
                self.extend(point);
            }
            TouchPhase::Up => {
                if !self.is_tracking() {
                    return false;
                }
                self.extend(point);
                self.completed = self.finish();
            }
            TouchPhase::Cancel => self.reset(),
        }
        true
    }
}
